use thiserror::Error;

/// Failures with a defined meaning at the component seams. Everything else
/// travels as `anyhow::Error` with context attached at the call site.
#[derive(Debug, Error)]
pub enum ListopsError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("unable to login to '{site}' as '{user}'")]
    AuthenticationFailed { site: String, user: String },
    #[error("archive fetch for '{url}' failed with HTTP status {status}")]
    MlmHttp { url: String, status: u16 },
}
