pub mod discovery;
pub mod files;
pub mod links;
pub mod recent_changes;
pub mod revisions;
