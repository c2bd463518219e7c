//! Archives a MediaWiki-backed wiki into a local, queryable SQLite store:
//! page and revision history, uploaded file metadata and bytes, and the
//! internal link graph, with checkpointed resume and a cooperative
//! incremental-update path.

pub mod api;
pub mod change_detector;
pub mod checkpoint_store;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod rate_limiter;
pub mod repository;
pub mod scrapers;
pub mod verifier;
