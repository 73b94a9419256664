//! Archive-state classifier: one probe per list, terminal verdict. Never
//! mutates anything on either backend.

use anyhow::{Context, Result};
use reqwest::Url;

use crate::doc::ArchiveStatus;
use crate::mlm::{FetchOutcome, PageFetcher, archive_page};
use crate::reconcile::ArchiveProbe;

/// The archive is served on plain http as well; asking for it there skips
/// the https redirect round-trip.
pub fn archive_url(web_url: &str) -> String {
    match web_url.strip_prefix("https:") {
        Some(rest) => format!("http:{rest}"),
        None => web_url.to_string(),
    }
}

fn resolve_href(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base).with_context(|| format!("unparseable archive url '{base}'"))?;
    let resolved = base
        .join(href)
        .with_context(|| format!("unresolvable link '{href}'"))?;
    Ok(resolved.to_string())
}

/// Probe the MLM for one list. A 404 on the archive page means the proxying
/// layer forwarded the MLM's answer for a list it does not know — that is the
/// `MissingFromMlm` verdict, not an error. Any other HTTP failure propagates.
pub fn classify(
    fetcher: &mut dyn PageFetcher,
    list_name: &str,
    web_url: &str,
) -> Result<ArchiveStatus> {
    let url = archive_url(web_url);
    let html = match fetcher.fetch(&url)? {
        FetchOutcome::NotFound => return Ok(ArchiveStatus::MissingFromMlm),
        FetchOutcome::Page(html) => html,
    };

    if archive_page::empty_notice(&html, list_name) {
        return Ok(ArchiveStatus::Empty);
    }

    // No empty notice: the list has messages. Read the date of the newest one
    // off the chronological view; if the markup has drifted, settle for a
    // dateless verdict rather than failing the item.
    let Some(href) = archive_page::chronological_href(&html) else {
        return Ok(ArchiveStatus::HasMessages { last: None });
    };
    let chrono_url = resolve_href(&url, &href)?;
    let last = match fetcher.fetch(&chrono_url)? {
        FetchOutcome::NotFound => None,
        FetchOutcome::Page(html) => archive_page::last_row_date(&html),
    };
    Ok(ArchiveStatus::HasMessages { last })
}

/// `ArchiveProbe` over a live (or faked) page fetcher.
pub struct MlmProbe<F: PageFetcher> {
    fetcher: F,
}

impl<F: PageFetcher> MlmProbe<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: PageFetcher> ArchiveProbe for MlmProbe<F> {
    fn classify(&mut self, list_name: &str, web_url: &str) -> Result<ArchiveStatus> {
        classify(&mut self.fetcher, list_name, web_url)
    }
}

#[cfg(test)]
mod tests {
    use super::{archive_url, classify};
    use crate::doc::ArchiveStatus;
    use crate::error::ListopsError;
    use crate::mlm::{FetchOutcome, PageFetcher};
    use anyhow::{Result, bail};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct FakeFetcher {
        pages: HashMap<String, FetchOutcome>,
        error_status: Option<u16>,
        fetched: Vec<String>,
    }

    impl FakeFetcher {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                error_status: None,
                fetched: Vec::new(),
            }
        }

        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages
                .insert(url.to_string(), FetchOutcome::Page(html.to_string()));
            self
        }

        fn not_found(mut self, url: &str) -> Self {
            self.pages.insert(url.to_string(), FetchOutcome::NotFound);
            self
        }

        fn erroring(mut self, status: u16) -> Self {
            self.error_status = Some(status);
            self
        }
    }

    impl PageFetcher for FakeFetcher {
        fn fetch(&mut self, url: &str) -> Result<FetchOutcome> {
            self.fetched.push(url.to_string());
            if let Some(status) = self.error_status {
                bail!(ListopsError::MlmHttp {
                    url: url.to_string(),
                    status,
                });
            }
            match self.pages.get(url) {
                Some(outcome) => Ok(outcome.clone()),
                None => Ok(FetchOutcome::NotFound),
            }
        }
    }

    const ARCHIVE: &str = "http://forge.example.com/projects/p/lists/dev/archive";

    #[test]
    fn archive_url_downgrades_https() {
        assert_eq!(
            archive_url("https://forge.example.com/a"),
            "http://forge.example.com/a"
        );
        assert_eq!(archive_url("http://forge.example.com/a"), "http://forge.example.com/a");
    }

    #[test]
    fn not_found_classifies_as_missing_from_mlm() {
        let mut fetcher = FakeFetcher::new().not_found(ARCHIVE);
        let got = classify(&mut fetcher, "dev", "https://forge.example.com/projects/p/lists/dev/archive")
            .expect("classify");
        assert_eq!(got, ArchiveStatus::MissingFromMlm);
        assert_eq!(fetcher.fetched, vec![ARCHIVE.to_string()]);
    }

    #[test]
    fn empty_notice_classifies_as_empty() {
        let html = r#"<div class="flash">The mailing list dev@p.example.net does not have any messages</div>"#;
        let mut fetcher = FakeFetcher::new().page(ARCHIVE, html);
        let got = classify(&mut fetcher, "dev", ARCHIVE).expect("classify");
        assert_eq!(got, ArchiveStatus::Empty);
    }

    #[test]
    fn chronological_page_yields_last_message_date() {
        let index = r#"<a href="chrono">Chronological</a>"#;
        let chrono = r#"<table>
            <tr><td>s</td><td>f</td><td>2021-04-30</td></tr>
            <tr><td>s</td><td>f</td><td>2021-05-02</td></tr>
        </table>"#;
        let mut fetcher = FakeFetcher::new()
            .page(ARCHIVE, index)
            .page("http://forge.example.com/projects/p/lists/dev/chrono", chrono);
        let got = classify(&mut fetcher, "dev", ARCHIVE).expect("classify");
        assert_eq!(
            got,
            ArchiveStatus::HasMessages {
                last: NaiveDate::from_ymd_opt(2021, 5, 2)
            }
        );
    }

    #[test]
    fn markup_drift_yields_dateless_has_messages() {
        let mut fetcher = FakeFetcher::new().page(ARCHIVE, "<p>unfamiliar page</p>");
        let got = classify(&mut fetcher, "dev", ARCHIVE).expect("classify");
        assert_eq!(got, ArchiveStatus::HasMessages { last: None });
    }

    #[test]
    fn non_404_http_errors_propagate() {
        let mut fetcher = FakeFetcher::new().erroring(503);
        let err = classify(&mut fetcher, "dev", ARCHIVE).unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
