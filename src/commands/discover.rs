use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::config;
use crate::forge::client::ForgeClient;
use crate::mlm::session::MlmSession;
use crate::reconcile::classify::MlmProbe;
use crate::reconcile::discover::{self, DiscoverOptions, DiscoverStats, ListSelection};

#[derive(Debug, Clone)]
pub struct DiscoverArgs {
    pub start: u32,
    pub length: Option<u32>,
    pub page_size: Option<u32>,
    pub keep: ListSelection,
    pub out: Option<PathBuf>,
}

pub fn run(args: &DiscoverArgs) -> Result<CommandReport> {
    let cfg = config::load_config()?;
    let client = ForgeClient::new(&cfg)?;
    let session = MlmSession::new(&cfg)?;
    let mut probe = MlmProbe::new(session);

    let opts = DiscoverOptions {
        start: args.start,
        length: args.length,
        page_size: args.page_size.or(Some(cfg.api.page_size)),
        keep: args.keep,
    };

    let stats: DiscoverStats = match &args.out {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            discover::run(&client, &mut probe, &opts, &mut file)?
        }
        None => {
            let stdout = io::stdout();
            discover::run(&client, &mut probe, &opts, &mut stdout.lock())?
        }
    };

    let summary = format!(
        "discovered {} lists across {} projects ({} pages)",
        stats.lists, stats.projects, stats.pages
    );
    let mut report = CommandReport::new("discover");
    match &args.out {
        // The document owns stdout when no file was given; keep the summary
        // off that stream.
        None => eprintln!("{summary}"),
        Some(_) => report.detail(summary),
    }
    Ok(report)
}
