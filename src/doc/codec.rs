//! Textual form of the command file: one YAML sequence, scanned with a
//! strict header/marker/data state machine. Comments are transparent to both
//! scanners; every other shape violation is a `MalformedDocument`.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};

use crate::doc::{ArchiveStatus, CommandHeader, Document, ListRecord, ProjectRecord, Record};
use crate::error::ListopsError;

const DATE_FMT: &str = "%Y-%m-%d";

fn malformed(msg: impl Into<String>) -> ListopsError {
    ListopsError::MalformedDocument(msg.into())
}

// ---------------------------------------------------------------------------
// encode

fn timestamp_value(ts: &DateTime<Utc>) -> Value {
    Value::from(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn archive_value(status: &ArchiveStatus) -> Value {
    match status {
        ArchiveStatus::Empty => Value::from("empty"),
        ArchiveStatus::MissingFromMlm => Value::from("missing_from_mlm"),
        ArchiveStatus::HasMessages { last } => {
            let mut m = Mapping::new();
            let date = match last {
                Some(d) => Value::from(d.format(DATE_FMT).to_string()),
                None => Value::Null,
            };
            m.insert(Value::from("has_messages"), date);
            Value::Mapping(m)
        }
    }
}

fn list_value(list: &ListRecord) -> Value {
    if list.created_at.is_none() && list.updated_at.is_none() && list.archive.is_none() {
        return Value::from(list.name.clone());
    }

    let mut m = Mapping::new();
    m.insert(Value::from("name"), Value::from(list.name.clone()));
    if let Some(ts) = &list.created_at {
        m.insert(Value::from("created_at"), timestamp_value(ts));
    }
    if let Some(ts) = &list.updated_at {
        m.insert(Value::from("updated_at"), timestamp_value(ts));
    }
    if let Some(status) = &list.archive {
        m.insert(Value::from("archive"), archive_value(status));
    }
    Value::Mapping(m)
}

fn project_value(project: &ProjectRecord) -> Value {
    let mut group = Vec::new();

    let mut m = Mapping::new();
    m.insert(Value::from("project"), Value::from(project.project.clone()));
    group.push(Value::Mapping(m));

    let mut m = Mapping::new();
    let parent = match &project.parent {
        Some(p) => Value::from(p.clone()),
        None => Value::Null,
    };
    m.insert(Value::from("parent"), parent);
    group.push(Value::Mapping(m));

    let mut m = Mapping::new();
    let lists = project.lists.iter().map(list_value).collect();
    m.insert(Value::from("lists"), Value::Sequence(lists));
    group.push(Value::Mapping(m));

    if let Some(issues) = &project.issues {
        let mut m = Mapping::new();
        let names = issues.iter().map(|n| Value::from(n.clone())).collect();
        m.insert(Value::from("issues"), Value::Sequence(names));
        group.push(Value::Mapping(m));
    }

    if let Some(has_scm) = project.has_scm {
        let mut m = Mapping::new();
        m.insert(Value::from("has_scm"), Value::Bool(has_scm));
        group.push(Value::Mapping(m));
    }

    Value::Sequence(group)
}

fn record_value(record: &Record) -> Value {
    match record {
        Record::Comment(text) => {
            let mut m = Mapping::new();
            let text = match text {
                Some(t) => Value::from(t.clone()),
                None => Value::Null,
            };
            m.insert(Value::from("comment"), text);
            Value::Mapping(m)
        }
        Record::Command(header) => {
            let mut m = Mapping::new();
            m.insert(Value::from("command"), Value::from(header.name.clone()));
            if header.force {
                m.insert(Value::from("force"), Value::Bool(true));
            }
            Value::Mapping(m)
        }
        Record::BeginData => {
            let mut m = Mapping::new();
            m.insert(Value::from("begin_data"), Value::Null);
            Value::Mapping(m)
        }
        Record::Project(project) => project_value(project),
    }
}

/// Render a run of records as a YAML sequence fragment. Fragments written
/// back to back concatenate into one well-formed document, which is what
/// lets discovery flush page by page.
pub fn encode_records(records: &[Record]) -> anyhow::Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }
    let seq = Value::Sequence(records.iter().map(record_value).collect());
    Ok(serde_yaml::to_string(&seq)?)
}

pub fn encode(doc: &Document) -> anyhow::Result<String> {
    encode_records(&doc.records)
}

// ---------------------------------------------------------------------------
// decode

fn as_opt_string(value: &Value, what: &str) -> Result<Option<String>, ListopsError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(malformed(format!("{what} must be a string or null, got {other:?}"))),
    }
}

fn parse_timestamp(value: &Value, what: &str) -> Result<Option<DateTime<Utc>>, ListopsError> {
    let Some(raw) = as_opt_string(value, what)? else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(&raw)
        .map_err(|err| malformed(format!("{what} '{raw}' is not an RFC 3339 timestamp: {err}")))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

fn parse_archive(value: &Value) -> Result<ArchiveStatus, ListopsError> {
    match value {
        Value::String(s) => match s.as_str() {
            "empty" => Ok(ArchiveStatus::Empty),
            "missing_from_mlm" => Ok(ArchiveStatus::MissingFromMlm),
            other => Err(malformed(format!("unknown archive status '{other}'"))),
        },
        Value::Mapping(m) => {
            if m.len() != 1 {
                return Err(malformed("archive status mapping must have exactly one key"));
            }
            let Some(date) = value.get("has_messages") else {
                return Err(malformed("archive status mapping must be keyed 'has_messages'"));
            };
            let last = match as_opt_string(date, "has_messages date")? {
                None => None,
                Some(raw) => Some(NaiveDate::parse_from_str(&raw, DATE_FMT).map_err(|err| {
                    malformed(format!("has_messages date '{raw}' is not YYYY-MM-DD: {err}"))
                })?),
            };
            Ok(ArchiveStatus::HasMessages { last })
        }
        other => Err(malformed(format!("archive status must be a string or mapping, got {other:?}"))),
    }
}

fn parse_list_entry(value: &Value) -> Result<ListRecord, ListopsError> {
    match value {
        Value::String(name) => Ok(ListRecord::named(name.clone())),
        Value::Mapping(m) => {
            let name = value
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("list mapping is missing a string 'name'"))?;
            let mut list = ListRecord::named(name);
            for (key, val) in m {
                let key = key
                    .as_str()
                    .ok_or_else(|| malformed("list mapping keys must be strings"))?;
                match key {
                    "name" => {}
                    "created_at" => list.created_at = parse_timestamp(val, "created_at")?,
                    "updated_at" => list.updated_at = parse_timestamp(val, "updated_at")?,
                    "archive" => list.archive = Some(parse_archive(val)?),
                    other => {
                        return Err(malformed(format!(
                            "unsupported key '{other}' in list entry '{name}'"
                        )));
                    }
                }
            }
            Ok(list)
        }
        other => Err(malformed(format!(
            "list entry must be a name or mapping, got {other:?}"
        ))),
    }
}

fn parse_string_seq(value: &Value, what: &str) -> Result<Vec<String>, ListopsError> {
    let Value::Sequence(items) = value else {
        return Err(malformed(format!("{what} must be a sequence")));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed(format!("{what} entries must be strings")))
        })
        .collect()
}

/// Assemble one project from an ordered group of single-key sub-records,
/// merging left to right; a duplicate key overwrites the earlier value.
fn parse_project_group(group: &[Value]) -> Result<ProjectRecord, ListopsError> {
    let mut project: Option<String> = None;
    let mut parent: Option<String> = None;
    let mut lists: Option<Vec<ListRecord>> = None;
    let mut issues: Option<Vec<String>> = None;
    let mut has_scm: Option<bool> = None;

    for item in group {
        let Value::Mapping(m) = item else {
            return Err(malformed(format!(
                "project group element must be a mapping, got {item:?}"
            )));
        };
        for (key, val) in m {
            let key = key
                .as_str()
                .ok_or_else(|| malformed("project group keys must be strings"))?;
            match key {
                "project" => {
                    project = Some(
                        val.as_str()
                            .ok_or_else(|| malformed("'project' must be a string"))?
                            .to_string(),
                    );
                }
                "parent" => parent = as_opt_string(val, "'parent'")?,
                "lists" => {
                    let Value::Sequence(entries) = val else {
                        return Err(malformed("'lists' must be a sequence"));
                    };
                    lists = Some(
                        entries
                            .iter()
                            .map(parse_list_entry)
                            .collect::<Result<_, _>>()?,
                    );
                }
                "issues" => issues = Some(parse_string_seq(val, "'issues'")?),
                "has_scm" => {
                    has_scm = Some(
                        val.as_bool()
                            .ok_or_else(|| malformed("'has_scm' must be a boolean"))?,
                    );
                }
                other => {
                    return Err(malformed(format!("unsupported key '{other}' in project group")));
                }
            }
        }
    }

    let Some(project) = project else {
        return Err(malformed("project group is missing a 'project' key"));
    };
    let lists = lists
        .ok_or_else(|| malformed(format!("project '{project}' has no 'lists' key")))?;
    if lists.is_empty() {
        return Err(malformed(format!("project '{project}' has an empty 'lists' sequence")));
    }

    Ok(ProjectRecord {
        project,
        parent,
        lists,
        issues,
        has_scm,
    })
}

fn parse_command_mapping(m: &Mapping) -> Result<CommandHeader, ListopsError> {
    let mut name: Option<String> = None;
    let mut force = false;
    for (key, val) in m {
        let key = key
            .as_str()
            .ok_or_else(|| malformed("command header keys must be strings"))?;
        match key {
            "command" => {
                name = Some(
                    val.as_str()
                        .ok_or_else(|| malformed("'command' must be a string"))?
                        .to_string(),
                );
            }
            "force" => {
                force = val
                    .as_bool()
                    .ok_or_else(|| malformed("'force' must be a boolean"))?;
            }
            other => {
                return Err(malformed(format!("unsupported key '{other}' in command header")));
            }
        }
    }
    Ok(CommandHeader {
        name: name.unwrap_or_default(),
        force,
    })
}

pub fn decode(text: &str) -> Result<Document, ListopsError> {
    let value: Value = serde_yaml::from_str(text)
        .map_err(|err| malformed(format!("not valid yaml: {err}")))?;
    let Value::Sequence(items) = value else {
        return Err(malformed("expected a top-level record sequence"));
    };

    let mut records = Vec::new();
    let mut seen_marker = false;
    let mut seen_command = false;

    for item in &items {
        match item {
            Value::Mapping(m) if item.get("comment").is_some() => {
                if m.len() != 1 {
                    return Err(malformed("comment record must have exactly one key"));
                }
                let text = as_opt_string(item.get("comment").unwrap_or(&Value::Null), "comment")?;
                records.push(Record::Comment(text));
            }
            Value::Mapping(m) if item.get("command").is_some() => {
                if seen_marker {
                    return Err(malformed("command header after the begin-data marker"));
                }
                if seen_command {
                    return Err(malformed("more than one command header"));
                }
                seen_command = true;
                records.push(Record::Command(parse_command_mapping(m)?));
            }
            Value::Mapping(m) if item.get("begin_data").is_some() => {
                if m.len() != 1 {
                    return Err(malformed("begin-data marker must have exactly one key"));
                }
                if seen_marker {
                    return Err(malformed("more than one begin-data marker"));
                }
                seen_marker = true;
                records.push(Record::BeginData);
            }
            Value::Sequence(group) => {
                if !seen_marker {
                    return Err(malformed("project data before the begin-data marker"));
                }
                records.push(Record::Project(parse_project_group(group)?));
            }
            other => {
                let region = if seen_marker { "data" } else { "header" };
                return Err(malformed(format!(
                    "unexpected {region}-region element: {other:?}"
                )));
            }
        }
    }

    if !seen_marker {
        return Err(malformed("missing begin-data marker"));
    }

    Ok(Document::new(records))
}

#[cfg(test)]
mod tests {
    use super::{decode, encode};
    use crate::doc::{
        ArchiveStatus, CommandHeader, Document, ListRecord, ProjectRecord, Record,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_doc() -> Document {
        Document::new(vec![
            Record::Comment(Some("This file is machine generated but can be manually edited.".into())),
            Record::Comment(None),
            Record::Command(CommandHeader {
                name: "domain_admin_delete_lists".into(),
                force: true,
            }),
            Record::BeginData,
            Record::Comment(Some("Begin page=1".into())),
            Record::Project(ProjectRecord {
                project: "glasswing".into(),
                parent: Some("butterflies".into()),
                lists: vec![
                    ListRecord {
                        name: "dev".into(),
                        created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
                        updated_at: Some(Utc.with_ymd_and_hms(2021, 5, 2, 12, 30, 0).unwrap()),
                        archive: Some(ArchiveStatus::HasMessages {
                            last: NaiveDate::from_ymd_opt(2021, 5, 2),
                        }),
                    },
                    ListRecord {
                        name: "users".into(),
                        created_at: None,
                        updated_at: None,
                        archive: Some(ArchiveStatus::Empty),
                    },
                ],
                issues: Some(vec!["bugzilla".into()]),
                has_scm: Some(true),
            }),
            Record::Project(ProjectRecord {
                project: "orphaned".into(),
                parent: None,
                lists: vec![
                    ListRecord {
                        name: "commits".into(),
                        created_at: None,
                        updated_at: None,
                        archive: Some(ArchiveStatus::MissingFromMlm),
                    },
                    ListRecord::named("announce"),
                ],
                issues: None,
                has_scm: None,
            }),
        ])
    }

    #[test]
    fn round_trip_preserves_every_record() {
        let doc = sample_doc();
        let text = encode(&doc).expect("encode");
        let back = decode(&text).expect("decode");
        assert_eq!(back, doc);
    }

    #[test]
    fn round_trip_without_command_header() {
        let doc = Document::new(vec![
            Record::Comment(None),
            Record::BeginData,
            Record::Project(ProjectRecord {
                project: "p".into(),
                parent: None,
                lists: vec![ListRecord::named("dev")],
                issues: None,
                has_scm: None,
            }),
        ]);
        let back = decode(&encode(&doc).expect("encode")).expect("decode");
        assert_eq!(back, doc);
        assert!(back.command().is_none());
    }

    #[test]
    fn name_only_lists_encode_as_bare_strings() {
        let doc = Document::new(vec![
            Record::BeginData,
            Record::Project(ProjectRecord {
                project: "p".into(),
                parent: None,
                lists: vec![ListRecord::named("dev")],
                issues: None,
                has_scm: None,
            }),
        ]);
        let text = encode(&doc).expect("encode");
        assert!(text.contains("- dev"), "bare name expected in:\n{text}");
        assert!(!text.contains("name: dev"));
    }

    #[test]
    fn missing_marker_is_rejected() {
        let text = "- comment: only a header\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("missing begin-data marker"));
    }

    #[test]
    fn command_after_marker_is_rejected() {
        let text = "- begin_data: null\n- command: domain_admin_create_lists\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("after the begin-data marker"));
    }

    #[test]
    fn duplicate_marker_is_rejected() {
        let text = "- begin_data: null\n- begin_data: null\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("more than one begin-data marker"));
    }

    #[test]
    fn scalar_in_data_region_is_rejected() {
        let text = "- begin_data: null\n- just a string\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("unexpected data-region element"));
    }

    #[test]
    fn project_before_marker_is_rejected() {
        let text = "- - project: p\n  - lists: [dev]\n- begin_data: null\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("before the begin-data marker"));
    }

    #[test]
    fn unknown_project_key_is_rejected() {
        let text = "- begin_data: null\n- - project: p\n  - wiki: big\n  - lists: [dev]\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("unsupported key 'wiki'"));
    }

    #[test]
    fn empty_lists_sequence_is_rejected() {
        let text = "- begin_data: null\n- - project: p\n  - lists: []\n";
        let err = decode(text).unwrap_err();
        assert!(err.to_string().contains("empty 'lists' sequence"));
    }

    #[test]
    fn duplicate_group_keys_merge_left_to_right() {
        let text = "- begin_data: null\n- - project: first\n  - project: second\n  - lists: [dev]\n";
        let doc = decode(text).expect("decode");
        let project = doc.projects().next().expect("one project");
        assert_eq!(project.project, "second");
    }

    #[test]
    fn comments_are_transparent_between_project_groups() {
        let text = concat!(
            "- begin_data: null\n",
            "- comment: Begin page=1\n",
            "- - project: a\n",
            "  - lists: [dev]\n",
            "- comment: Begin page=2\n",
            "- - project: b\n",
            "  - lists: [users]\n",
        );
        let doc = decode(text).expect("decode");
        let names: Vec<&str> = doc.projects().map(|p| p.project.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn unknown_command_name_is_accepted_by_the_codec() {
        let text = "- command: domain_admin_rename_lists\n- begin_data: null\n";
        let doc = decode(text).expect("decode");
        assert_eq!(doc.command().expect("header").name, "domain_admin_rename_lists");
    }
}
