mod api_error;
mod scrape_error;
pub mod storage_error;

pub use api_error::ApiError;
pub use scrape_error::ScrapeError;
pub use storage_error::StorageError;

/// Top-level error type. Subsystem errors convert into this via `From`.
#[derive(Debug, thiserror::Error)]
pub enum ArchivistError {
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ArchivistResult<T> = Result<T, ArchivistError>;
