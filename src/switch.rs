//! Profile switching logic.
//!
//! This module implements the core mechanism of `cxs`: activating a profile.
//! It handles:
//! - Backing up the live `auth.json` and `config.toml` before touching them.
//! - Writing the profile's secret into `auth.json`.
//! - Patching the profile's provider settings into `config.toml`.
//! - Rotating old backups.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::{AuthUpdate, update_auth_file};
use crate::config_patch::{ConfigUpdate, update_config_file};
use crate::error::{Error, Result};
use crate::paths::Paths;
use crate::profiles::Profile;

/// Number of backups to keep per file
const MAX_BACKUPS: usize = 10;

/// Everything a switch did, for reporting
#[derive(Debug, Clone)]
pub struct SwitchReport {
    pub profile: String,
    pub backups: Vec<PathBuf>,
    pub auth: AuthUpdate,
    pub config: ConfigUpdate,
}

/// Switch to a profile
///
/// The credential file is written first, then the config file. A failure in
/// either stops the switch and is returned as is; nothing is retried.
pub fn switch_to_profile(paths: &Paths, profile: &Profile) -> Result<SwitchReport> {
    fs::create_dir_all(&paths.codex_dir).map_err(|e| Error::io(&paths.codex_dir, e))?;

    let mut backups = Vec::new();
    for file in [&paths.auth_file, &paths.config_file] {
        if let Some(backup) = backup_existing_file(file, &paths.backups_dir)? {
            backups.push(backup);
        }
    }

    let auth = update_auth_file(&paths.auth_file, &profile.secret)?;
    let config = update_config_file(&paths.config_file, &profile.settings)?;

    tracing::debug!(profile = %profile.name, "switched profile");
    Ok(SwitchReport {
        profile: profile.name.clone(),
        backups,
        auth,
        config,
    })
}

/// Copy a file into the backups dir as `<file name>.<timestamp>.bak`
///
/// Returns the backup path, or `None` when there was nothing to back up.
pub fn backup_existing_file(path: &Path, backups_dir: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }

    let Some(name_prefix) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };

    fs::create_dir_all(backups_dir).map_err(|e| Error::io(backups_dir, e))?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S%.3f").to_string();
    let backup_path = backups_dir.join(format!("{}.{}.bak", name_prefix, timestamp));

    fs::copy(path, &backup_path).map_err(|e| Error::io(path, e))?;

    // Rotate backups
    cleanup_old_backups(backups_dir, name_prefix)?;

    Ok(Some(backup_path))
}

fn cleanup_old_backups(backups_dir: &Path, name_prefix: &str) -> Result<()> {
    let prefix = format!("{}.", name_prefix);
    let mut backups: Vec<_> = fs::read_dir(backups_dir)
        .map_err(|e| Error::io(backups_dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
        })
        .collect();

    if backups.len() <= MAX_BACKUPS {
        return Ok(());
    }

    // Timestamps sort lexically, oldest first
    backups.sort_by_key(|b| b.file_name());

    let to_remove = backups.len() - MAX_BACKUPS;
    for entry in backups.iter().take(to_remove) {
        let path = entry.path();
        fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
    }

    Ok(())
}
