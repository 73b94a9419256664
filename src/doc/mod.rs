pub mod codec;

use chrono::{DateTime, NaiveDate, Utc};

pub const CREATE_LISTS: &str = "domain_admin_create_lists";
pub const DELETE_LISTS: &str = "domain_admin_delete_lists";

/// Verdict for a list's real-world archive state. Exactly one of the three,
/// or unset on a record that has not been classified yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// The archive has delivered messages; `last` is the date of the most
    /// recent one when the chronological page could be read.
    HasMessages { last: Option<NaiveDate> },
    Empty,
    MissingFromMlm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRecord {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub archive: Option<ArchiveStatus>,
}

impl ListRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: None,
            updated_at: None,
            archive: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub project: String,
    pub parent: Option<String>,
    pub lists: Vec<ListRecord>,
    pub issues: Option<Vec<String>>,
    pub has_scm: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHeader {
    pub name: String,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Comment(Option<String>),
    Command(CommandHeader),
    BeginData,
    Project(ProjectRecord),
}

/// Ordered record sequence as read from or written to a command file. The
/// codec guarantees the structural invariants: exactly one begin-data marker,
/// at most one command header and only before the marker, project records
/// only after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub records: Vec<Record>,
}

impl Document {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn command(&self) -> Option<&CommandHeader> {
        self.records.iter().find_map(|r| match r {
            Record::Command(header) => Some(header),
            _ => None,
        })
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.records.iter().filter_map(|r| match r {
            Record::Project(p) => Some(p),
            _ => None,
        })
    }
}
