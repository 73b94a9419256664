//! The three questions we ever ask an archive page. All of this leans on the
//! MLM's markup and wording staying put, so matching is best-effort: a miss
//! answers "no"/"unknown", never an error.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

static FLASH_RE: OnceLock<Regex> = OnceLock::new();
static CHRONO_RE: OnceLock<Regex> = OnceLock::new();
static ROW_RE: OnceLock<Regex> = OnceLock::new();
static CELL_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d %b %Y"];

fn flash_re() -> &'static Regex {
    FLASH_RE.get_or_init(|| {
        Regex::new(r#"(?s)<div[^>]*class="[^"]*flash[^"]*"[^>]*>(.*?)</div>"#)
            .expect("flash regex")
    })
}

fn chrono_re() -> &'static Regex {
    CHRONO_RE.get_or_init(|| {
        Regex::new(r#"(?s)<a\s[^>]*href="([^"]+)"[^>]*>\s*Chronological\s*</a>"#)
            .expect("chronological regex")
    })
}

fn row_re() -> &'static Regex {
    ROW_RE.get_or_init(|| Regex::new(r"(?s)<tr[^>]*>(.*?)</tr>").expect("row regex"))
}

fn cell_re() -> &'static Regex {
    CELL_RE.get_or_init(|| Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("cell regex"))
}

fn strip_tags(html: &str) -> String {
    let re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex"));
    re.replace_all(html, "").trim().to_string()
}

/// Does the page carry the "does not have any messages" notice for `list_name`?
pub fn empty_notice(html: &str, list_name: &str) -> bool {
    let Some(flash) = flash_re().captures(html) else {
        return false;
    };
    let text = strip_tags(&flash[1]);
    let pattern = format!(
        r"The mailing list {}@\S* does not have any messages",
        regex::escape(list_name)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(&text),
        Err(_) => false,
    }
}

/// Href of the chronological-view link, if the page has one.
pub fn chronological_href(html: &str) -> Option<String> {
    chrono_re()
        .captures(html)
        .map(|caps| caps[1].to_string())
}

/// Date in the third cell of the last data row, however the MLM formats it.
pub fn last_row_date(html: &str) -> Option<NaiveDate> {
    let last_row = row_re()
        .captures_iter(html)
        .filter(|row| cell_re().captures_iter(&row[0]).count() >= 3)
        .last()?;
    let cells: Vec<String> = cell_re()
        .captures_iter(&last_row[1])
        .map(|c| strip_tags(&c[1]))
        .collect();
    let raw = cells.get(2)?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
