mod checkpoint;
mod file;
mod link;
mod page;
mod revision;
mod scrape_run;

pub use checkpoint::{Checkpoint, CheckpointPhase};
pub use file::{FileChange, FileRecord};
pub use link::{Link, LinkType};
pub use page::{Page, PageUpdateInfo};
pub use revision::Revision;
pub use scrape_run::{RunStatus, RunType, ScrapeRun};
