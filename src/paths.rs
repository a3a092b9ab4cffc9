use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// Environment variable overriding the codex directory
pub const CODEX_HOME_ENV: &str = "CODEX_HOME";

/// All computed paths used by cxs
#[derive(Debug, Clone)]
pub struct Paths {
    /// ~/.codex
    pub codex_dir: PathBuf,
    /// ~/.codex/apiConfig.json
    pub store_file: PathBuf,
    /// ~/.codex/auth.json
    pub auth_file: PathBuf,
    /// ~/.codex/config.toml
    pub config_file: PathBuf,
    /// ~/.codex/backups
    pub backups_dir: PathBuf,
}

impl Paths {
    /// Resolve the codex directory: explicit override, then `CODEX_HOME`, then `~/.codex`.
    pub fn new(codex_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = codex_dir {
            return Ok(Self::with_root(dir));
        }

        if let Some(dir) = std::env::var_os(CODEX_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(dir)));
        }

        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;
        Ok(Self::with_root(base_dirs.home_dir().join(".codex")))
    }

    /// Lay out every file under the given codex directory
    pub fn with_root(codex_dir: impl Into<PathBuf>) -> Self {
        let codex_dir = codex_dir.into();
        let store_file = codex_dir.join("apiConfig.json");
        let auth_file = codex_dir.join("auth.json");
        let config_file = codex_dir.join("config.toml");
        let backups_dir = codex_dir.join("backups");

        Self {
            codex_dir,
            store_file,
            auth_file,
            config_file,
            backups_dir,
        }
    }

    /// Ensure the codex directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.codex_dir).with_context(|| {
            format!("Failed to create codex directory: {:?}", self.codex_dir)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_layout_under_root() {
        let paths = Paths::with_root("/tmp/codex");
        assert!(paths.store_file.ends_with("codex/apiConfig.json"));
        assert!(paths.auth_file.ends_with("codex/auth.json"));
        assert!(paths.config_file.ends_with("codex/config.toml"));
        assert!(paths.backups_dir.starts_with(&paths.codex_dir));
    }

    #[test]
    #[serial]
    fn test_explicit_dir_wins_over_env() {
        unsafe { std::env::set_var(CODEX_HOME_ENV, "/from/env") };
        let paths = Paths::new(Some(PathBuf::from("/from/flag"))).unwrap();
        unsafe { std::env::remove_var(CODEX_HOME_ENV) };
        assert_eq!(paths.codex_dir, PathBuf::from("/from/flag"));
    }

    #[test]
    #[serial]
    fn test_codex_home_env() {
        let temp_dir = TempDir::new().unwrap();
        unsafe { std::env::set_var(CODEX_HOME_ENV, temp_dir.path()) };
        let paths = Paths::new(None).unwrap();
        unsafe { std::env::remove_var(CODEX_HOME_ENV) };
        assert_eq!(paths.codex_dir, temp_dir.path());
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::with_root(temp_dir.path().join("nested/.codex"));
        paths.ensure_dirs().unwrap();
        assert!(paths.codex_dir.is_dir());
    }
}
