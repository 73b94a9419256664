use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::commands::CommandReport;
use crate::doc::codec;
use crate::reconcile::filter::{self, FilterSpec};

pub fn run(spec: &FilterSpec, input: &Path, out: Option<&Path>) -> Result<CommandReport> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let document = codec::decode(&raw)?;
    let read = document.projects().count();

    let filtered = filter::apply(&document, spec);
    let kept = filtered.projects().count();
    let text = codec::encode(&filtered)?;

    match out {
        Some(path) => fs::write(path, &text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout().write_all(text.as_bytes())?,
    }

    let summary = format!("{spec}: kept {kept} of {read} projects");
    let mut report = CommandReport::new("filter");
    match out {
        None => eprintln!("{summary}"),
        Some(_) => report.detail(summary),
    }
    Ok(report)
}
