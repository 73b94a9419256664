//! Reconciliation engine: executes the command a document carries against
//! the two backends, one list at a time. Creation is idempotent with a
//! bounded retry budget and a delete-and-retry self-heal when the metadata
//! API and the MLM disagree; deletion refuses non-empty archives unless
//! forced. Individual item failures are reported and skipped — only
//! structural or authentication problems abort a run.

use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::io::Write;

use crate::audit::AuditLog;
use crate::doc::{ArchiveStatus, CREATE_LISTS, DELETE_LISTS, Document};
use crate::reconcile::{ArchiveProbe, FeatureStore};

pub const MAX_TRIES: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub created: u32,
    pub deleted: u32,
    pub skipped: u32,
    pub failed: u32,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn feature_descriptor(list: &str) -> Value {
    let display = capitalize(list);
    json!({
        "feature": {
            "name": list,
            "service": "lists",
            "display_name": display,
            "description": display,
        }
    })
}

pub struct Engine<'a> {
    store: &'a dyn FeatureStore,
    probe: &'a mut dyn ArchiveProbe,
    out: &'a mut dyn Write,
    audit: Option<&'a AuditLog>,
    opts: ExecuteOptions,
}

impl<'a> Engine<'a> {
    pub fn new(
        store: &'a dyn FeatureStore,
        probe: &'a mut dyn ArchiveProbe,
        out: &'a mut dyn Write,
        audit: Option<&'a AuditLog>,
        opts: ExecuteOptions,
    ) -> Self {
        Self {
            store,
            probe,
            out,
            audit,
            opts,
        }
    }

    fn record(&self, operation: &str, status: &str, message: &str) -> Result<()> {
        if self.opts.dry_run {
            return Ok(());
        }
        if let Some(audit) = self.audit {
            audit.append(operation, status, message)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, doc: &Document) -> Result<RunSummary> {
        let Some(header) = doc.command() else {
            bail!("document has no command header; nothing to execute");
        };
        if self.opts.dry_run {
            writeln!(self.out, "Dry run: no destructive operations will be executed...")?;
        }

        let mut summary = RunSummary::default();
        match header.name.as_str() {
            CREATE_LISTS => self.create_lists(doc, &mut summary)?,
            DELETE_LISTS => {
                let force = self.opts.force || header.force;
                self.delete_lists(doc, force, &mut summary)?;
            }
            other => bail!("command '{other}' is not valid"),
        }
        self.out.flush()?;
        Ok(summary)
    }

    fn create_lists(&mut self, doc: &Document, summary: &mut RunSummary) -> Result<()> {
        for project in doc.projects() {
            let Some(features) = self.store.project_features(&project.project)? else {
                writeln!(self.out, "Project '{}' is not found. Skipping.", project.project)?;
                summary.skipped += project.lists.len() as u32;
                continue;
            };
            for list in &project.lists {
                if let Some(existing) = features.iter().find(|f| f.name == list.name) {
                    writeln!(
                        self.out,
                        "Feature with name='{}', service='{}' already exists for project='{}'. Skipping.",
                        list.name, existing.service, project.project
                    )?;
                    summary.skipped += 1;
                    continue;
                }
                self.create_list(&project.project, &list.name, summary)?;
            }
        }
        Ok(())
    }

    fn create_list(&mut self, project: &str, list: &str, summary: &mut RunSummary) -> Result<()> {
        let descriptor = feature_descriptor(list);
        let mut tries_left = MAX_TRIES;
        while tries_left > 0 {
            tries_left -= 1;
            write!(self.out, "Creating list for project='{project}' list='{list}'... ")?;

            if self.opts.dry_run {
                writeln!(self.out, "done (dry run)")?;
                summary.created += 1;
                return Ok(());
            }

            let status = match self.store.create_feature(project, &descriptor) {
                Ok(status) => status,
                Err(err) => {
                    writeln!(self.out, "transient API failure: {err:#}")?;
                    self.record(
                        "create_list",
                        "retry",
                        &format!("project='{project}' list='{list}' transport error"),
                    )?;
                    continue;
                }
            };
            if status != 201 {
                writeln!(self.out, "failed (HTTP {status})")?;
                self.record(
                    "create_list",
                    "failed",
                    &format!("project='{project}' list='{list}' HTTP {status}"),
                )?;
                continue;
            }

            // The API reports success; make sure the list service agrees
            // before calling it done.
            let Some(created) = self.store.project_feature(project, list)? else {
                writeln!(self.out, "created but not readable back; retrying")?;
                continue;
            };
            let verdict = match &created.web_url {
                Some(url) => Some(self.probe.classify(list, url)?),
                None => None,
            };
            if matches!(verdict, Some(ArchiveStatus::MissingFromMlm)) {
                writeln!(
                    self.out,
                    "created but missing from the list service; deleting the feature and retrying"
                )?;
                self.store.delete_feature(project, list)?;
                self.record(
                    "delete_list",
                    "heal",
                    &format!("project='{project}' list='{list}' inconsistent with list service"),
                )?;
                continue;
            }

            writeln!(self.out, "done")?;
            self.record(
                "create_list",
                "ok",
                &format!("project='{project}' list='{list}'"),
            )?;
            summary.created += 1;
            return Ok(());
        }

        writeln!(
            self.out,
            "Giving up on project='{project}' list='{list}' after {MAX_TRIES} attempts."
        )?;
        summary.failed += 1;
        Ok(())
    }

    fn delete_lists(&mut self, doc: &Document, force: bool, summary: &mut RunSummary) -> Result<()> {
        for project in doc.projects() {
            let Some(features) = self.store.project_features(&project.project)? else {
                writeln!(self.out, "Project '{}' is not found. Skipping.", project.project)?;
                summary.skipped += project.lists.len() as u32;
                continue;
            };
            for list in &project.lists {
                // Matched by name only among the project's features.
                let Some(feature) = features.iter().find(|f| f.name == list.name) else {
                    writeln!(
                        self.out,
                        "List for project='{}' list='{}' does not exist. Ignoring.",
                        project.project, list.name
                    )?;
                    summary.skipped += 1;
                    continue;
                };

                if !force {
                    let Some(url) = &feature.web_url else {
                        writeln!(
                            self.out,
                            "List for project='{}' list='{}' has no archive url; cannot verify emptiness. Skipping.",
                            project.project, list.name
                        )?;
                        summary.skipped += 1;
                        continue;
                    };
                    let verdict = self.probe.classify(&list.name, url)?;
                    if !matches!(
                        verdict,
                        ArchiveStatus::Empty | ArchiveStatus::MissingFromMlm
                    ) {
                        writeln!(
                            self.out,
                            "List for project='{}' list='{}' is not empty. Skipping.",
                            project.project, list.name
                        )?;
                        summary.skipped += 1;
                        continue;
                    }
                }

                self.delete_list(&project.project, &list.name)?;
                summary.deleted += 1;
            }
        }
        Ok(())
    }

    fn delete_list(&mut self, project: &str, list: &str) -> Result<()> {
        write!(self.out, "Deleting list for project='{project}' list='{list}'... ")?;
        if self.opts.dry_run {
            writeln!(self.out, "done (dry run)")?;
            return Ok(());
        }
        self.store.delete_feature(project, list)?;
        writeln!(self.out, "done")?;
        self.record(
            "delete_list",
            "ok",
            &format!("project='{project}' list='{list}'"),
        )?;
        Ok(())
    }
}
