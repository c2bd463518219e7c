/// Errors raised by the file fetcher (C8) and the two orchestrators (C12/C13).
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("digest mismatch downloading {title}: expected {expected}, got {actual}")]
    Download {
        title: String,
        expected: String,
        actual: String,
    },

    #[error("incremental scrape requires a prior full scrape; run `full` first")]
    FirstRunRequiresFullScrape,

    #[error("run interrupted")]
    Interrupted,

    #[error(">{failure_rate_pct:.1}% of pages failed ({failed}/{total})")]
    ExcessiveFailureRate {
        failed: usize,
        total: usize,
        failure_rate_pct: f64,
    },
}
