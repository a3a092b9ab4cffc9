//! Profile store loading and validation.
//!
//! The store (`~/.codex/apiConfig.json`) is a JSON array of records:
//!
//! ```json
//! [{ "name": "duck", "OPENAI_API_KEY": "sk-...", "config": { "model_providers": "duck", ... } }]
//! ```
//!
//! Records are checked one at a time. A record that fails a check is dropped
//! and reported as a [`Rejection`]; the rest of the batch still loads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::error::{Error, Result};
use crate::fs_utils::{read_if_exists, write_atomic};

/// Config fields that must be present as non-empty strings
const REQUIRED_CONFIG_FIELDS: [&str; 5] =
    ["model_providers", "name", "base_url", "wire_api", "env_key"];

/// Provider connection settings of a profile (the record's `config` object)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(
        default,
        rename = "model_reasoning_effort",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning_effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_response_storage: Option<bool>,
    /// Suffix of the `[model_providers.<group>]` section
    #[serde(rename = "model_providers")]
    pub provider_group: String,
    #[serde(rename = "name")]
    pub provider_name: String,
    pub base_url: String,
    pub wire_api: String,
    pub env_key: String,
}

/// A named credential plus the provider settings it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(rename = "OPENAI_API_KEY")]
    pub secret: String,
    #[serde(rename = "config")]
    pub settings: ProviderSettings,
}

/// Why a single store record was dropped
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("entry is not a JSON object")]
    NotAnObject,
    #[error("missing a non-empty `name` string")]
    MissingName,
    #[error("missing a `config` object")]
    MissingConfig,
    #[error("`OPENAI_API_KEY` must be a string")]
    SecretNotString,
    #[error("`config.{0}` is missing or not a non-empty string")]
    MissingField(&'static str),
    #[error("`config.model_providers` must use only letters, digits, `_` or `-`: {group:?}")]
    InvalidProviderGroup { group: String },
    #[error("`config.base_url` is not a valid URL: {url}")]
    InvalidBaseUrl { url: String },
    #[error("malformed entry: {0}")]
    Malformed(String),
    #[error("duplicate profile name `{0}`")]
    DuplicateName(String),
}

/// A dropped record, kept as a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Zero-based position in the store array
    pub index: usize,
    /// The record's name, when it had a usable one
    pub name: Option<String>,
    pub error: ValidationError,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "entry {} ({}): {}", self.index + 1, name, self.error),
            None => write!(f, "entry {}: {}", self.index + 1, self.error),
        }
    }
}

/// Result of loading the store: accepted profiles in store order, plus rejections
#[derive(Debug, Clone, Default)]
pub struct LoadedProfiles {
    pub profiles: Vec<Profile>,
    pub rejected: Vec<Rejection>,
}

impl LoadedProfiles {
    pub fn find(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Load and validate the profile store
///
/// Fails with [`Error::NotFound`] when the file is absent, [`Error::InvalidJson`]
/// or [`Error::NotAnArray`] when the document has the wrong shape, and
/// [`Error::EmptyResult`] when no record survives validation.
pub fn load_profiles(path: &Path) -> Result<LoadedProfiles> {
    let bytes = read_if_exists(path)?.ok_or_else(|| Error::NotFound {
        path: path.to_path_buf(),
    })?;

    let document: Value = serde_json::from_slice(&bytes).map_err(|source| Error::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;

    let records = document.as_array().ok_or_else(|| Error::NotAnArray {
        path: path.to_path_buf(),
    })?;

    let loaded = validate_profiles(records);

    if loaded.profiles.is_empty() {
        return Err(Error::EmptyResult {
            path: path.to_path_buf(),
            rejected: loaded.rejected,
        });
    }

    tracing::debug!(
        accepted = loaded.profiles.len(),
        rejected = loaded.rejected.len(),
        "loaded profile store {}",
        path.display()
    );
    Ok(loaded)
}

/// Validate every record, keeping input order and collecting rejections
pub fn validate_profiles(records: &[Value]) -> LoadedProfiles {
    let mut loaded = LoadedProfiles::default();
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let outcome = validate_record(record).and_then(|profile| {
            if seen.contains(&profile.name) {
                Err(ValidationError::DuplicateName(profile.name))
            } else {
                Ok(profile)
            }
        });

        match outcome {
            Ok(profile) => {
                seen.insert(profile.name.clone());
                loaded.profiles.push(profile);
            }
            Err(error) => {
                let name = record
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .map(String::from);
                let rejection = Rejection { index, name, error };
                tracing::warn!("skipping profile {}", rejection);
                loaded.rejected.push(rejection);
            }
        }
    }

    loaded
}

/// Check one raw store record and convert it into a typed [`Profile`]
pub fn validate_record(record: &Value) -> Result<Profile, ValidationError> {
    let object = record.as_object().ok_or(ValidationError::NotAnObject)?;

    match object.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => {}
        _ => return Err(ValidationError::MissingName),
    }

    let config = object
        .get("config")
        .and_then(Value::as_object)
        .ok_or(ValidationError::MissingConfig)?;

    if !object.get("OPENAI_API_KEY").is_some_and(Value::is_string) {
        return Err(ValidationError::SecretNotString);
    }

    for field in REQUIRED_CONFIG_FIELDS {
        match config.get(field).and_then(Value::as_str) {
            Some(value) if !value.is_empty() => {}
            _ => return Err(ValidationError::MissingField(field)),
        }
    }

    let group = config
        .get("model_providers")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !is_bare_key(group) {
        return Err(ValidationError::InvalidProviderGroup {
            group: group.to_string(),
        });
    }

    let base_url = config
        .get("base_url")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if Url::parse(base_url).is_err() {
        return Err(ValidationError::InvalidBaseUrl {
            url: base_url.to_string(),
        });
    }

    Profile::deserialize(record).map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// Whether `key` can follow `model_providers.` in a header without quoting
fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The profile whose secret is the one currently in the credential file
pub fn find_active<'a>(
    profiles: &'a [Profile],
    active_secret: Option<&str>,
) -> Option<&'a Profile> {
    let secret = active_secret.filter(|s| !s.is_empty())?;
    profiles.iter().find(|p| p.secret == secret)
}

/// Mask a secret for display, keeping the first and last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "not set".to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    let stars = "*".repeat((chars.len() - 8).max(4));
    format!("{head}{stars}{tail}")
}

/// Two placeholder profiles used to seed a fresh store
pub fn example_profiles() -> Vec<Profile> {
    [
        ("duck", "https://jp.instcopilot-api.com/v1"),
        ("playcode", "https://playcode.com/v1"),
    ]
    .into_iter()
    .map(|(name, base_url)| Profile {
        name: name.to_string(),
        secret: String::new(),
        settings: ProviderSettings {
            model_provider: Some(String::new()),
            model: Some(String::new()),
            reasoning_effort: Some(String::new()),
            disable_response_storage: Some(true),
            provider_group: name.to_string(),
            provider_name: name.to_string(),
            base_url: base_url.to_string(),
            wire_api: "responses".to_string(),
            env_key: name.to_string(),
        },
    })
    .collect()
}

/// Write the example store as pretty JSON
pub fn write_example_store(path: &Path) -> Result<()> {
    let content = serde_json::to_vec_pretty(&example_profiles()).map_err(|source| Error::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn record(name: &str, base_url: &str) -> Value {
        json!({
            "name": name,
            "OPENAI_API_KEY": format!("sk-{name}-0000000000"),
            "config": {
                "model_provider": name,
                "model": "gpt-5",
                "model_reasoning_effort": "high",
                "disable_response_storage": true,
                "model_providers": name,
                "name": name,
                "base_url": base_url,
                "wire_api": "responses",
                "env_key": "OPENAI_API_KEY"
            }
        })
    }

    fn write_store(temp_dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = temp_dir.path().join("apiConfig.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_invalid_url_is_excluded() {
        let records = vec![
            record("alpha", "https://a.example/v1"),
            record("broken", "not-a-url"),
            record("gamma", "https://c.example/v1"),
        ];

        let loaded = validate_profiles(&records);

        assert_eq!(loaded.names(), vec!["alpha", "gamma"]);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].index, 1);
        assert_eq!(loaded.rejected[0].name.as_deref(), Some("broken"));
        assert!(matches!(
            loaded.rejected[0].error,
            ValidationError::InvalidBaseUrl { .. }
        ));
    }

    #[test]
    fn test_provider_group_must_be_bare_key() {
        for group in ["my relay", "a]b", "line\nbreak", "dotted.group"] {
            let mut entry = record("relay", "https://r.example");
            entry["config"]["model_providers"] = json!(group);

            assert_eq!(
                validate_record(&entry).unwrap_err(),
                ValidationError::InvalidProviderGroup {
                    group: group.to_string()
                }
            );
        }

        let mut entry = record("relay", "https://r.example");
        entry["config"]["model_providers"] = json!("my-relay_2");
        assert!(validate_record(&entry).is_ok());
    }

    #[test]
    fn test_each_check_rejects() {
        let mut no_group = record("a", "https://a.example");
        no_group["config"]["model_providers"] = json!("");
        let mut numeric_key = record("b", "https://b.example");
        numeric_key["OPENAI_API_KEY"] = json!(42);
        let mut bad_model = record("c", "https://c.example");
        bad_model["config"]["model"] = json!(7);

        let cases = vec![
            (json!("just a string"), ValidationError::NotAnObject),
            (json!({"config": {}}), ValidationError::MissingName),
            (json!({"name": "x", "OPENAI_API_KEY": ""}), ValidationError::MissingConfig),
            (no_group, ValidationError::MissingField("model_providers")),
            (numeric_key, ValidationError::SecretNotString),
        ];

        for (value, expected) in cases {
            assert_eq!(validate_record(&value).unwrap_err(), expected);
        }
        assert!(matches!(
            validate_record(&bad_model).unwrap_err(),
            ValidationError::Malformed(_)
        ));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let value = json!({
            "name": "lean",
            "OPENAI_API_KEY": "",
            "config": {
                "model_providers": "lean",
                "name": "Lean",
                "base_url": "http://localhost:8080/v1",
                "wire_api": "chat",
                "env_key": "LEAN_KEY"
            }
        });

        let profile = validate_record(&value).unwrap();
        assert_eq!(profile.settings.model, None);
        assert_eq!(profile.settings.disable_response_storage, None);
        assert_eq!(profile.settings.provider_name, "Lean");
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let records = vec![
            record("alpha", "https://a.example/v1"),
            record("alpha", "https://other.example/v1"),
        ];

        let loaded = validate_profiles(&records);

        assert_eq!(loaded.profiles.len(), 1);
        assert_eq!(loaded.profiles[0].settings.base_url, "https://a.example/v1");
        assert_eq!(
            loaded.rejected[0].error,
            ValidationError::DuplicateName("alpha".to_string())
        );
    }

    #[test]
    fn test_load_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_profiles(&temp_dir.path().join("apiConfig.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_load_rejects_non_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_store(&temp_dir, r#"{"name": "alpha"}"#);
        assert!(matches!(load_profiles(&path).unwrap_err(), Error::NotAnArray { .. }));

        let path = write_store(&temp_dir, "[not json");
        assert!(matches!(load_profiles(&path).unwrap_err(), Error::InvalidJson { .. }));
    }

    #[test]
    fn test_load_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_store(&temp_dir, "[]");
        let err = load_profiles(&path).unwrap_err();
        match err {
            Error::EmptyResult { rejected, .. } => assert!(rejected.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_all_invalid_is_empty_result() {
        let temp_dir = TempDir::new().unwrap();
        let content = serde_json::to_string(&vec![record("x", "nope")]).unwrap();
        let path = write_store(&temp_dir, &content);
        let err = load_profiles(&path).unwrap_err();
        match err {
            Error::EmptyResult { rejected, .. } => {
                assert_eq!(rejected.len(), 1);
                assert!(matches!(rejected[0].error, ValidationError::InvalidBaseUrl { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_find_active() {
        let loaded = validate_profiles(&[
            record("alpha", "https://a.example"),
            record("beta", "https://b.example"),
        ]);

        let active = find_active(&loaded.profiles, Some("sk-beta-0000000000"));
        assert_eq!(active.map(|p| p.name.as_str()), Some("beta"));
        assert!(find_active(&loaded.profiles, Some("")).is_none());
        assert!(find_active(&loaded.profiles, None).is_none());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "not set");
        assert_eq!(mask_secret("12345678"), "not set");
        assert_eq!(mask_secret("sk-AAAA1111"), "sk-A****1111");
        assert_eq!(mask_secret("abcdefghijklmnop"), "abcd********mnop");
    }

    #[test]
    fn test_example_store_loads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("apiConfig.json");
        write_example_store(&path).unwrap();

        let loaded = load_profiles(&path).unwrap();
        assert_eq!(loaded.names(), vec!["duck", "playcode"]);
        assert!(loaded.rejected.is_empty());
    }
}
