//! Error types shared by the library operations.
//!
//! Load-time structural failures and I/O failures surface as [`Error`].
//! Per-record validation failures never do: they are collected as
//! [`Rejection`](crate::profiles::Rejection) diagnostics instead.

use std::io;
use std::path::PathBuf;

use crate::profiles::Rejection;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("profile store not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("profile store is not valid JSON: {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("profile store must contain a JSON array: {}", path.display())]
    NotAnArray { path: PathBuf },

    #[error("no valid profiles in {} ({} rejected)", path.display(), rejected.len())]
    EmptyResult {
        path: PathBuf,
        rejected: Vec<Rejection>,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means the store itself is unusable (missing, malformed or empty)
    pub fn is_store_problem(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidJson { .. }
                | Self::NotAnArray { .. }
                | Self::EmptyResult { .. }
        )
    }
}
