use std::path::PathBuf;

use thiserror::Error;

/// Failures inside the synchronization and aggregation core.
///
/// None of these abort the program: scrapes degrade to partial data, caches
/// to a miss, and unreadable entries drop out of a single query.
#[derive(Debug, Error)]
pub enum Error {
    #[error("page failed to load: {0}")]
    ScrapeTransport(String),

    #[error("could not extract {what}: {reason}")]
    ScrapeExtraction { what: String, reason: String },

    #[error("cache file {path:?} is unreadable: {reason}")]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("entry `{id}` has an unusable date: {reason}")]
    MembershipData { id: String, reason: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<fantoccini::error::CmdError> for Error {
    fn from(error: fantoccini::error::CmdError) -> Self {
        Error::ScrapeTransport(error.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for Error {
    fn from(error: fantoccini::error::NewSessionError) -> Self {
        Error::ScrapeTransport(format!("could not start browser session: {error}"))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
