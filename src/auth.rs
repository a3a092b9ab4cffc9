//! Credential file (`auth.json`) updates.
//!
//! Only `OPENAI_API_KEY` is ever touched. Every other key in the document is
//! carried through unchanged, including keys this tool knows nothing about.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fs_utils::{read_if_exists, write_private};

/// Key holding the active secret
pub const SECRET_KEY: &str = "OPENAI_API_KEY";

/// What happened to a target file during an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// The file did not exist and was written fresh
    Created,
    /// The existing content was updated in place
    Updated,
    /// The existing content could not be used and was replaced
    Recovered { reason: String },
}

#[derive(Debug, Clone)]
pub struct AuthUpdate {
    pub path: PathBuf,
    pub action: FileAction,
}

/// Set `OPENAI_API_KEY` in the credential file, creating the file if needed
///
/// An unparseable or non-object document is treated as absent: it is replaced
/// by a document holding only the secret, and the reason is reported on the
/// returned [`AuthUpdate`].
pub fn update_auth_file(path: &Path, secret: &str) -> Result<AuthUpdate> {
    let (mut document, action) = match read_if_exists(path)? {
        None => (Map::new(), FileAction::Created),
        Some(bytes) => match parse_document(&bytes) {
            Ok(document) => (document, FileAction::Updated),
            Err(reason) => {
                tracing::warn!("cannot parse {}, rewriting it: {}", path.display(), reason);
                (Map::new(), FileAction::Recovered { reason })
            }
        },
    };

    set_secret(&mut document, secret);

    let content = serde_json::to_vec_pretty(&document).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_private(path, &content)?;

    tracing::debug!("wrote {} to {}", SECRET_KEY, path.display());
    Ok(AuthUpdate {
        path: path.to_path_buf(),
        action,
    })
}

/// Overwrite the reserved key, leaving every other key alone
pub fn set_secret(document: &mut Map<String, Value>, secret: &str) {
    document.insert(SECRET_KEY.to_string(), Value::String(secret.to_string()));
}

fn parse_document(bytes: &[u8]) -> Result<Map<String, Value>, String> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
