//! Filter pipeline: read one document, emit a new one. The header travels
//! through untouched (plus a provenance comment) so the output can be
//! re-filtered or executed; projects whose list set empties out are dropped.

use chrono::NaiveDate;
use std::fmt;

use crate::doc::{ArchiveStatus, Document, ListRecord, ProjectRecord, Record};

pub const ISSUES_LIST_NAME: &str = "issues";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    /// Keep lists created strictly before the threshold date.
    AgeBefore(NaiveDate),
    /// Keep lists whose feature record was last touched before the threshold.
    ArchiveStaleBefore(NaiveDate),
    /// Keep lists the MLM does not know about.
    MissingFromMlm,
    /// Keep lists whose name differs from the given one.
    NameNot(String),
    /// Keep projects that have an issue tracker but no "issues" list yet,
    /// rewriting their list set to the single entry to create.
    IssuesCorrelation,
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::AgeBefore(date) => write!(f, "age-before threshold={date}"),
            FilterSpec::ArchiveStaleBefore(date) => {
                write!(f, "archive-stale-before threshold={date}")
            }
            FilterSpec::MissingFromMlm => write!(f, "missing-from-mlm"),
            FilterSpec::NameNot(name) => write!(f, "name-not name={name}"),
            FilterSpec::IssuesCorrelation => write!(f, "issues-correlation"),
        }
    }
}

impl FilterSpec {
    fn keep_list(&self, list: &ListRecord) -> bool {
        match self {
            FilterSpec::AgeBefore(threshold) => list
                .created_at
                .is_some_and(|ts| ts.date_naive() < *threshold),
            FilterSpec::ArchiveStaleBefore(threshold) => list
                .updated_at
                .is_some_and(|ts| ts.date_naive() < *threshold),
            FilterSpec::MissingFromMlm => {
                matches!(list.archive, Some(ArchiveStatus::MissingFromMlm))
            }
            FilterSpec::NameNot(name) => list.name != *name,
            FilterSpec::IssuesCorrelation => true,
        }
    }

    fn apply_to_project(&self, project: &ProjectRecord) -> Option<ProjectRecord> {
        if let FilterSpec::IssuesCorrelation = self {
            let has_tracker = project.issues.as_ref().is_some_and(|i| !i.is_empty());
            let has_issues_list = project.lists.iter().any(|l| l.name == ISSUES_LIST_NAME);
            if !(has_tracker && !has_issues_list) {
                return None;
            }
            return Some(ProjectRecord {
                lists: vec![ListRecord::named(ISSUES_LIST_NAME)],
                ..project.clone()
            });
        }

        let lists: Vec<ListRecord> = project
            .lists
            .iter()
            .filter(|l| self.keep_list(l))
            .cloned()
            .collect();
        if lists.is_empty() {
            return None;
        }
        Some(ProjectRecord {
            lists,
            ..project.clone()
        })
    }
}

pub fn apply(input: &Document, spec: &FilterSpec) -> Document {
    let mut records = Vec::new();
    for record in &input.records {
        if matches!(record, Record::BeginData) {
            break;
        }
        records.push(record.clone());
    }

    records.push(Record::Comment(Some(format!("Filter applied: {spec}"))));
    records.push(Record::BeginData);

    for project in input.projects() {
        if let Some(filtered) = spec.apply_to_project(project) {
            records.push(Record::Project(filtered));
        }
    }

    Document::new(records)
}
