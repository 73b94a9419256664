use anyhow::Result;

use crate::commands::CommandReport;
use crate::config;
use crate::forge::client::ForgeClient;

pub fn run() -> Result<CommandReport> {
    let cfg = config::load_config()?;
    let client = ForgeClient::new(&cfg)?;
    client.ping()?;

    let mut report = CommandReport::new("ping");
    report.detail(format!("{} answers", cfg.site.url));
    Ok(report)
}
