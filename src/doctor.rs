//! Diagnostic tool for cxs.
//!
//! This module implements the `cxs doctor` command, which checks the setup
//! for common issues:
//! - Existence of the codex directory.
//! - Validity of the profile store and each of its entries.
//! - Readability of `auth.json` and `config.toml`.
//! - Duplicate provider blocks left behind by hand edits.
//!
//! It reports issues to the user with a pass/fail/warn status.

use anstyle::AnsiColor;
use std::fs;

use crate::config_patch::provider_groups;
use crate::paths::{CODEX_HOME_ENV, Paths};
use crate::profiles::{find_active, load_profiles};
use crate::snapshot::{FileStatus, Snapshot};
use crate::ui::{Status, Ui};

/// Run the doctor diagnostics, returning whether every check passed
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("cxs Doctor");
    ui.newline();

    let snapshot = Snapshot::read(paths);
    let mut healthy = true;

    // 1. Check directories
    healthy &= check_step(ui, "Directories", || {
        if let Ok(home) = std::env::var(CODEX_HOME_ENV) {
            ui.item(Status::Info, format!("{} set to: {}", CODEX_HOME_ENV, home));
        }

        if paths.codex_dir.is_dir() {
            ui.item(Status::Ok, format!("Codex directory exists: {}", paths.codex_dir.display()));
            true
        } else {
            ui.item(Status::Err, format!("Codex directory missing: {}", paths.codex_dir.display()));
            false
        }
    });

    // 2. Check the profile store
    let profiles = {
        let mut loaded = None;
        healthy &= check_step(ui, "Profile Store", || match load_profiles(&paths.store_file) {
            Ok(result) => {
                ui.item(
                    Status::Ok,
                    format!(
                        "{} valid profiles in {}",
                        result.profiles.len(),
                        paths.store_file.display()
                    ),
                );
                for profile in &result.profiles {
                    let line = format!("{} ({})", profile.name, profile.settings.base_url);
                    ui.sub_item(Status::Ok, line);
                }
                for rejection in &result.rejected {
                    ui.sub_item(Status::Warn, rejection.to_string());
                }
                loaded = Some(result.profiles);
                true
            }
            Err(e) => {
                ui.item(Status::Err, e.to_string());
                false
            }
        });
        loaded.unwrap_or_default()
    };

    // 3. Check auth.json
    healthy &= check_step(ui, "Credential File", || match &snapshot.auth_status {
        FileStatus::Missing => {
            ui.item(Status::Warn, "auth.json missing (written on first switch)");
            true
        }
        FileStatus::Valid => {
            match &snapshot.secret {
                Some(_) => ui.item(Status::Ok, "auth.json has an API key"),
                None => ui.item(Status::Warn, "auth.json has no OPENAI_API_KEY"),
            }
            true
        }
        FileStatus::Unreadable(reason) => {
            ui.item(Status::Err, format!("auth.json unreadable: {}", reason));
            ui.item(Status::Info, "The next switch will rewrite it");
            false
        }
    });

    // 4. Check config.toml
    healthy &= check_step(ui, "Config File", || {
        match &snapshot.config_status {
            FileStatus::Missing => {
                ui.item(Status::Warn, "config.toml missing (written on first switch)");
                return true;
            }
            FileStatus::Valid => ui.item(Status::Ok, "config.toml parses as TOML"),
            FileStatus::Unreadable(reason) => {
                ui.item(Status::Err, format!("config.toml does not parse: {}", reason));
            }
        }

        // Count blocks from the raw text; a parser rejects duplicate tables
        // but hand-edited files may still carry several distinct groups.
        let Ok(text) = fs::read_to_string(&paths.config_file) else {
            return false;
        };
        let groups = provider_groups(&text);
        match groups.len() {
            0 => ui.item(Status::Warn, "No provider block"),
            1 => ui.item(Status::Ok, format!("Provider block: {}", groups[0])),
            n => ui.item(
                Status::Warn,
                format!(
                    "{} provider blocks ({}); the next switch keeps only one",
                    n,
                    groups.join(", ")
                ),
            ),
        }
        snapshot.config_status == FileStatus::Valid
    });

    // 5. Active profile
    check_step(ui, "Active Profile", || {
        match find_active(&profiles, snapshot.secret.as_deref()) {
            Some(profile) => {
                ui.item(Status::Ok, format!("Active key belongs to: {}", profile.name));

                let configured = snapshot
                    .config
                    .as_ref()
                    .and_then(|c| c.providers.first())
                    .map(|p| p.group.as_str());
                if configured.is_some_and(|g| g != profile.settings.provider_group) {
                    ui.item(
                        Status::Warn,
                        format!(
                            "config.toml points at a different provider than '{}'",
                            profile.name
                        ),
                    );
                }
            }
            None => ui.item(Status::Info, "No stored profile matches the active key"),
        }
        true
    });

    if healthy {
        ui.ok("No problems found");
    } else {
        ui.warn("Some checks failed, see above");
    }
    healthy
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
    }
    ui.newline();
    success
}
