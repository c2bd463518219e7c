mod client;
mod pagination;
pub mod types;

pub use client::ApiClient;
pub use pagination::paginate;
