use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::audit::AuditLog;
use crate::commands::CommandReport;
use crate::config;
use crate::doc::codec;
use crate::forge::client::ForgeClient;
use crate::mlm::session::MlmSession;
use crate::reconcile::classify::MlmProbe;
use crate::reconcile::engine::{Engine, ExecuteOptions};

#[derive(Debug, Clone)]
pub struct ExecuteArgs {
    pub file: PathBuf,
    pub force: bool,
    pub dry_run: bool,
}

pub fn run(args: &ExecuteArgs) -> Result<CommandReport> {
    // Structural problems in the file must surface before anything else is
    // even configured.
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let document = codec::decode(&raw)?;

    let cfg = config::load_config()?;
    let client = ForgeClient::new(&cfg)?;
    let session = MlmSession::new(&cfg)?;
    let mut probe = MlmProbe::new(session);
    let audit = AuditLog::open_default()?;

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        force: args.force,
    };
    let mut stdout = io::stdout().lock();
    let summary = Engine::new(&client, &mut probe, &mut stdout, Some(&audit), opts)
        .execute(&document)?;
    drop(stdout);

    let mut report = CommandReport::new("execute");
    report.detail(format!(
        "created={} deleted={} skipped={} failed={}",
        summary.created, summary.deleted, summary.skipped, summary.failed
    ));
    Ok(report)
}
