//! Discovery pipeline: walk the project catalog page by page, classify every
//! list feature, and stream the resulting records out as each page finishes.
//! A run killed mid-way leaves a well-formed document holding the pages that
//! were already flushed.

use anyhow::Result;
use std::fmt;
use std::io::Write;

use crate::doc::{ArchiveStatus, ListRecord, ProjectRecord, Record, codec};
use crate::doc::{CREATE_LISTS, DELETE_LISTS};
use crate::forge::{FEATURE_TYPE_ISSUES, FEATURE_TYPE_SCM, Project};
use crate::reconcile::{ArchiveProbe, ProjectSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListSelection {
    #[default]
    All,
    MissingOnly,
    EmptyOnly,
}

impl fmt::Display for ListSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ListSelection::All => "all",
            ListSelection::MissingOnly => "missing",
            ListSelection::EmptyOnly => "empty",
        };
        f.write_str(label)
    }
}

impl ListSelection {
    fn keeps(self, status: Option<&ArchiveStatus>) -> bool {
        match self {
            ListSelection::All => true,
            ListSelection::MissingOnly => matches!(status, Some(ArchiveStatus::MissingFromMlm)),
            ListSelection::EmptyOnly => matches!(status, Some(ArchiveStatus::Empty)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub start: u32,
    pub length: Option<u32>,
    pub page_size: Option<u32>,
    pub keep: ListSelection,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            start: 1,
            length: None,
            page_size: None,
            keep: ListSelection::All,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverStats {
    pub pages: u32,
    pub projects: u32,
    pub lists: u32,
}

fn fmt_opt(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "~".to_string(),
    }
}

fn header_records(opts: &DiscoverOptions) -> Vec<Record> {
    vec![
        Record::Comment(Some(
            "This file is machine generated but can be manually edited.".into(),
        )),
        Record::Comment(Some(
            "Replace 'comment' with 'command' on one of the lines below to make the file executable; add 'force: true' alongside to skip the emptiness check on deletion.".into(),
        )),
        Record::Comment(Some(CREATE_LISTS.into())),
        Record::Comment(Some(DELETE_LISTS.into())),
        Record::Comment(None),
        Record::Comment(Some(format!(
            "Discovery arguments: start={}, length={}, page_size={}, keep={}",
            opts.start,
            fmt_opt(opts.length),
            fmt_opt(opts.page_size),
            opts.keep,
        ))),
        Record::BeginData,
    ]
}

fn project_record(
    project: &Project,
    probe: &mut dyn ArchiveProbe,
    keep: ListSelection,
) -> Result<Option<ProjectRecord>> {
    let mut lists = Vec::new();
    for feature in project.features.iter().filter(|f| f.is_list()) {
        // A list feature without an archive URL cannot be probed; it stays
        // unclassified rather than guessing.
        let archive = match &feature.web_url {
            Some(url) => Some(probe.classify(&feature.name, url)?),
            None => None,
        };
        if !keep.keeps(archive.as_ref()) {
            continue;
        }
        lists.push(ListRecord {
            name: feature.name.clone(),
            created_at: feature.created_at_utc(),
            updated_at: feature.updated_at_utc(),
            archive,
        });
    }

    if lists.is_empty() {
        return Ok(None);
    }

    let issues: Vec<String> = project
        .features
        .iter()
        .filter(|f| f.kind == FEATURE_TYPE_ISSUES)
        .map(|f| f.name.clone())
        .collect();
    let has_scm = project.features.iter().any(|f| f.kind == FEATURE_TYPE_SCM);

    Ok(Some(ProjectRecord {
        project: project.name.clone(),
        parent: project.parent.clone(),
        lists,
        issues: if issues.is_empty() { None } else { Some(issues) },
        has_scm: if has_scm { Some(true) } else { None },
    }))
}

pub fn run(
    source: &dyn ProjectSource,
    probe: &mut dyn ArchiveProbe,
    opts: &DiscoverOptions,
    out: &mut dyn Write,
) -> Result<DiscoverStats> {
    let mut stats = DiscoverStats::default();

    out.write_all(codec::encode_records(&header_records(opts))?.as_bytes())?;
    out.flush()?;

    let limit = opts.length.map(|len| opts.start.saturating_add(len));
    let mut page = opts.start;
    loop {
        if let Some(limit) = limit
            && page >= limit
        {
            break;
        }
        let projects = source.projects_page(page, opts.page_size)?;
        if projects.is_empty() {
            break;
        }

        let mut records = vec![Record::Comment(Some(format!("Begin page={page}")))];
        for project in &projects {
            if let Some(record) = project_record(project, probe, opts.keep)? {
                stats.projects += 1;
                stats.lists += record.lists.len() as u32;
                records.push(Record::Project(record));
            }
        }

        // Flush the whole fragment before moving on; a crash from here on
        // loses at most the page in flight.
        out.write_all(codec::encode_records(&records)?.as_bytes())?;
        out.flush()?;
        stats.pages += 1;
        page += 1;
    }

    Ok(stats)
}
