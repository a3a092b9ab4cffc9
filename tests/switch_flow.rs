use std::fs;

use cxswitch::error::Error;
use cxswitch::paths::Paths;
use cxswitch::profiles::{find_active, load_profiles};
use cxswitch::snapshot::Snapshot;
use cxswitch::switch::switch_to_profile;
use tempfile::TempDir;

const STORE: &str = r#"[
  {
    "name": "alpha",
    "OPENAI_API_KEY": "sk-AAAA1111",
    "config": {
      "model_provider": "alpha",
      "model": "gpt-5",
      "model_reasoning_effort": "high",
      "disable_response_storage": true,
      "model_providers": "alpha",
      "name": "alpha",
      "base_url": "https://a.example/v1",
      "wire_api": "responses",
      "env_key": "OPENAI_API_KEY"
    }
  },
  {
    "name": "beta",
    "OPENAI_API_KEY": "sk-BBBB2222",
    "config": {
      "model_providers": "beta",
      "name": "Beta Relay",
      "base_url": "https://b.example/v1",
      "wire_api": "chat",
      "env_key": "BETA_KEY"
    }
  }
]"#;

fn setup(store: &str) -> (TempDir, Paths) {
    let temp_dir = TempDir::new().unwrap();
    let paths = Paths::with_root(temp_dir.path().join(".codex"));
    fs::create_dir_all(&paths.codex_dir).unwrap();
    fs::write(&paths.store_file, store).unwrap();
    (temp_dir, paths)
}

#[test]
fn switching_rewrites_both_files_and_keeps_user_settings() {
    let (_temp, paths) = setup(STORE);
    fs::write(
        &paths.auth_file,
        r#"{"OPENAI_API_KEY": "sk-old", "tokens": {"refresh": "r"}}"#,
    )
    .unwrap();
    fs::write(
        &paths.config_file,
        "model = \"o3\"\n\
         approval_policy = \"never\"\n\
         \n\
         [model_providers.old]\n\
         name = \"old\"\n\
         base_url = \"https://old.example\"\n\
         wire_api = \"responses\"\n\
         env_key = \"OPENAI_API_KEY\"\n\
         \n\
         [mcp_servers.docs]\n\
         command = \"docs-mcp\"\n",
    )
    .unwrap();

    let loaded = load_profiles(&paths.store_file).unwrap();
    let beta = loaded.find("beta").unwrap();
    let report = switch_to_profile(&paths, beta).unwrap();
    assert_eq!(report.backups.len(), 2);

    let auth: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&paths.auth_file).unwrap()).unwrap();
    assert_eq!(auth["OPENAI_API_KEY"], "sk-BBBB2222");
    assert_eq!(auth["tokens"]["refresh"], "r");

    let config = fs::read_to_string(&paths.config_file).unwrap();
    assert!(config.contains("[model_providers.beta]"));
    assert!(config.contains("base_url = \"https://b.example/v1\""));
    assert!(!config.contains("[model_providers.old]"));
    assert!(config.contains("approval_policy = \"never\""));
    assert!(config.contains("[mcp_servers.docs]"));

    let snapshot = Snapshot::read(&paths);
    let active = find_active(&loaded.profiles, snapshot.secret.as_deref()).unwrap();
    assert_eq!(active.name, "beta");
}

#[test]
fn switching_back_and_forth_is_stable() {
    let (_temp, paths) = setup(STORE);
    let loaded = load_profiles(&paths.store_file).unwrap();
    let alpha = loaded.find("alpha").unwrap();
    let beta = loaded.find("beta").unwrap();

    switch_to_profile(&paths, alpha).unwrap();
    let first = fs::read_to_string(&paths.config_file).unwrap();
    switch_to_profile(&paths, beta).unwrap();
    switch_to_profile(&paths, alpha).unwrap();
    let again = fs::read_to_string(&paths.config_file).unwrap();

    assert_eq!(first, again);
}

#[test]
fn empty_store_fails_before_touching_codex_files() {
    let (_temp, paths) = setup("[]");

    let err = load_profiles(&paths.store_file).unwrap_err();

    assert!(matches!(err, Error::EmptyResult { .. }));
    assert!(!paths.auth_file.exists());
    assert!(!paths.config_file.exists());
}
