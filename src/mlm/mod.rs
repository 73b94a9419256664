pub mod archive_page;
pub mod session;

use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Page(String),
    NotFound,
}

/// The classifier's only view of the MLM web UI. `NotFound` is surfaced as a
/// value because a 404 carries meaning here; every other HTTP failure comes
/// back as an error.
pub trait PageFetcher {
    fn fetch(&mut self, url: &str) -> Result<FetchOutcome>;
}
