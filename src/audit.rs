use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub operation: String,
    pub status: String,
    pub message: String,
}

/// Append-only JSONL trail of every mutating backend call. Dry runs write
/// nothing here.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn open_default() -> Result<Self> {
        if let Ok(custom) = env::var("LISTOPS_AUDIT_LOG") {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                return Ok(Self::new(PathBuf::from(trimmed)));
            }
        }

        let home = dirs::home_dir().context("HOME directory could not be resolved")?;
        Ok(Self::new(home.join(".listops").join("audit.log")))
    }

    pub fn append(&self, operation: &str, status: &str, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let event = AuditEvent {
            at_epoch_secs: now_epoch_secs()?,
            operation: operation.to_string(),
            status: status.to_string(),
            message: message.to_string(),
        };

        let line = format!("{}\n", serde_json::to_string(&event)?);
        use std::io::Write;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
