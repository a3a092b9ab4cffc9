//! Test utilities shared across test modules
//!
//! This module provides common helper functions for testing, avoiding duplication
//! across multiple test suites.

use crate::paths::Paths;
use tempfile::TempDir;

/// Create a Paths struct for testing using a temporary directory
///
/// Mimics the real `~/.codex/` layout inside the temp directory. Nothing is
/// created on disk.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_root(temp_dir.path().join(".codex"))
}

/// A store file with two valid profiles, `alpha` and `beta`
pub fn two_profile_store() -> &'static str {
    r#"[
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
      "model_provider": "beta",
      "model": "gpt-5-codex",
      "model_reasoning_effort": "medium",
      "disable_response_storage": false,
      "model_providers": "beta",
      "name": "Beta Relay",
      "base_url": "https://b.example/v1",
      "wire_api": "chat",
      "env_key": "BETA_KEY"
    }
  }
]"#
}
