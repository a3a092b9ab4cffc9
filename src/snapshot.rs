//! Read-only view of the live `auth.json` / `config.toml` pair.
//!
//! Used by `cxs current` and `cxs doctor`. Nothing here writes.

use serde_json::Value;
use std::path::Path;

use crate::auth::SECRET_KEY;
use crate::config_patch::{PROVIDER_TABLE, ScalarField};
use crate::fs_utils::read_if_exists;
use crate::paths::Paths;

const PROVIDER_FIELDS: [&str; 4] = ["name", "base_url", "wire_api", "env_key"];

/// How a file looked when it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Missing,
    Valid,
    Unreadable(String),
}

/// One `[model_providers.<group>]` table as parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTable {
    pub group: String,
    /// `(key, rendered value)` for the known provider keys that are present
    pub fields: Vec<(String, String)>,
}

/// Parsed view of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigView {
    /// `(key, rendered value)` for the top-level fields a profile controls
    pub fields: Vec<(&'static str, String)>,
    pub providers: Vec<ProviderTable>,
}

impl ConfigView {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub auth_status: FileStatus,
    pub secret: Option<String>,
    pub config_status: FileStatus,
    pub config: Option<ConfigView>,
}

impl Snapshot {
    pub fn read(paths: &Paths) -> Self {
        let (auth_status, secret) = read_auth(&paths.auth_file);
        let (config_status, config) = read_config(&paths.config_file);
        Self {
            auth_status,
            secret,
            config_status,
            config,
        }
    }

    /// Neither file exists yet
    pub fn is_empty(&self) -> bool {
        self.auth_status == FileStatus::Missing && self.config_status == FileStatus::Missing
    }
}

fn read_auth(path: &Path) -> (FileStatus, Option<String>) {
    let bytes = match read_if_exists(path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return (FileStatus::Missing, None),
        Err(e) => return (FileStatus::Unreadable(e.to_string()), None),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => {
            let secret = map.get(SECRET_KEY).and_then(Value::as_str).map(String::from);
            (FileStatus::Valid, secret)
        }
        Ok(_) => (FileStatus::Unreadable("expected a JSON object".to_string()), None),
        Err(e) => (FileStatus::Unreadable(e.to_string()), None),
    }
}

fn read_config(path: &Path) -> (FileStatus, Option<ConfigView>) {
    let bytes = match read_if_exists(path) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return (FileStatus::Missing, None),
        Err(e) => return (FileStatus::Unreadable(e.to_string()), None),
    };

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return (FileStatus::Unreadable(e.to_string()), None),
    };

    match parse_config(&text) {
        Ok(view) => (FileStatus::Valid, Some(view)),
        Err(e) => (FileStatus::Unreadable(e), None),
    }
}

/// Parse config text with a real TOML parser, for display only
pub fn parse_config(text: &str) -> Result<ConfigView, String> {
    let table: toml::Table = toml::from_str(text).map_err(|e| e.to_string())?;

    let fields = ScalarField::ALL
        .iter()
        .filter_map(|field| {
            table
                .get(field.key())
                .map(|value| (field.key(), render(value)))
        })
        .collect();

    let providers = table
        .get(PROVIDER_TABLE)
        .and_then(toml::Value::as_table)
        .map(|groups| {
            groups
                .iter()
                .map(|(group, body)| ProviderTable {
                    group: group.clone(),
                    fields: PROVIDER_FIELDS
                        .iter()
                        .filter_map(|key| {
                            body.get(*key).map(|value| (key.to_string(), render(value)))
                        })
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ConfigView { fields, providers })
}

fn render(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_paths;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        let snapshot = Snapshot::read(&paths);

        assert!(snapshot.is_empty());
        assert!(snapshot.secret.is_none());
        assert!(snapshot.config.is_none());
    }

    #[test]
    fn test_reads_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::create_dir_all(&paths.codex_dir).unwrap();
        fs::write(&paths.auth_file, r#"{"OPENAI_API_KEY": "sk-live", "other": 1}"#).unwrap();
        fs::write(
            &paths.config_file,
            "model = \"gpt-5\"\ndisable_response_storage = true\napproval_policy = \"never\"\n\n\
             [model_providers.duck]\nname = \"Duck\"\nbase_url = \"https://duck.example\"\n",
        )
        .unwrap();

        let snapshot = Snapshot::read(&paths);

        assert_eq!(snapshot.secret.as_deref(), Some("sk-live"));
        let config = snapshot.config.unwrap();
        assert_eq!(config.get("model"), Some("\"gpt-5\""));
        assert_eq!(config.get("disable_response_storage"), Some("true"));
        assert_eq!(config.get("approval_policy"), None);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].group, "duck");
        assert_eq!(
            config.providers[0].fields,
            vec![
                ("name".to_string(), "\"Duck\"".to_string()),
                ("base_url".to_string(), "\"https://duck.example\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_unreadable_files_are_reported() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::create_dir_all(&paths.codex_dir).unwrap();
        fs::write(&paths.auth_file, "nope").unwrap();
        fs::write(&paths.config_file, "model = = broken").unwrap();

        let snapshot = Snapshot::read(&paths);

        assert!(matches!(snapshot.auth_status, FileStatus::Unreadable(_)));
        assert!(matches!(snapshot.config_status, FileStatus::Unreadable(_)));
        assert!(!snapshot.is_empty());
    }
}
