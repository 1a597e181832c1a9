use std::io;
use thiserror::Error;

/// Error taxonomy for a scrape run. None of these are retried internally;
/// every variant is fatal and surfaces at the process boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential load or token exchange failed.
    #[error("auth failed: {0}")]
    Auth(String),

    /// Folder create-then-verify against the storage backend failed.
    #[error("can't make directory '{title}' under '{parent_id}'")]
    DirectoryCreation { parent_id: String, title: String },

    /// The trend provider rejected or failed a query.
    #[error("fetch failed for keyword '{keyword}': {reason}")]
    Fetch { keyword: String, reason: String },

    /// A merged series did not line up with the table's existing index.
    #[error("series '{keyword}' has {got} rows, table has {expected}")]
    ShapeMismatch {
        keyword: String,
        expected: usize,
        got: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn fetch(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
