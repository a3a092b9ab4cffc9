//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (`list`, `use`,
//! `current`, etc.).
//! It serves as the coordination layer, interacting with:
//! - `crate::ui` for user interaction (output, prompts).
//! - `crate::paths` for filesystem locations.
//! - `crate::profiles` for loading the profile store.
//! - `crate::switch` for profile activation.
//! - `crate::snapshot` for reading the live codex files.
//!
//! Each function here generally corresponds to a subcommand in `main.rs`.

use anstyle::AnsiColor;
use anyhow::{Context, Result, anyhow, bail};
use inquire::{InquireError, Select};

use crate::doctor::run_doctor;
use crate::error::Error;
use crate::paths::Paths;
use crate::profiles::{LoadedProfiles, Profile, find_active, load_profiles, write_example_store};
use crate::snapshot::{FileStatus, Snapshot};
use crate::switch::{SwitchReport, switch_to_profile};
use crate::ui::{Status, Ui};

/// Show all profiles, then prompt for one to switch to
pub fn list(paths: &Paths, ui: &Ui) -> Result<()> {
    let loaded = load_store(paths, ui)?;
    let snapshot = Snapshot::read(paths);
    let active = find_active(&loaded.profiles, snapshot.secret.as_deref());

    ui.section("Profiles");
    ui.println(ui.profile_table(&loaded.profiles, active).to_string());
    ui.newline();

    let Some(selected) = select_profile(&loaded.profiles, active)? else {
        ui.warn("Cancelled.");
        return Ok(());
    };

    if active.is_some_and(|a| a.name == selected.name) {
        ui.info(format!("'{}' is already the active profile, nothing to do", selected.name));
        return Ok(());
    }

    activate(paths, selected, ui)
}

/// Switch to a profile by name
pub fn use_profile(paths: &Paths, name: &str, ui: &Ui) -> Result<()> {
    let loaded = load_store(paths, ui)?;

    let Some(profile) = loaded.find(name) else {
        bail!(
            "Profile '{}' does not exist.\nHint: Available profiles: {}",
            name,
            loaded.names().join(", ")
        );
    };

    activate(paths, profile, ui)
}

/// Show the active credential and provider configuration
pub fn current(paths: &Paths, ui: &Ui, reveal: bool) -> Result<()> {
    let snapshot = Snapshot::read(paths);

    if snapshot.is_empty() {
        ui.warn("No codex configuration found.");
        ui.newline();
        ui.println("Pick a profile with:");
        ui.println(format!("  {} list", ui.bold("cxs")));
        return Ok(());
    }

    ui.section("auth.json");
    match (&snapshot.auth_status, &snapshot.secret) {
        (FileStatus::Missing, _) => ui.item(Status::Warn, "auth.json is missing"),
        (FileStatus::Unreadable(reason), _) => {
            ui.item(Status::Err, format!("auth.json is unreadable: {}", reason))
        }
        (FileStatus::Valid, Some(secret)) => ui.item(
            Status::Ok,
            format!("OPENAI_API_KEY = {}", ui.secret(secret, reveal)),
        ),
        (FileStatus::Valid, None) => ui.item(Status::Warn, "OPENAI_API_KEY is not set"),
    }
    ui.newline();

    ui.section("config.toml");
    match (&snapshot.config_status, &snapshot.config) {
        (FileStatus::Valid, Some(config)) => {
            let fields = config.fields.iter().map(|(key, value)| (*key, value.as_str()));
            ui.println(ui.pairs(fields).to_string());

            for provider in &config.providers {
                ui.newline();
                let header = format!("[model_providers.{}]", provider.group);
                ui.println(ui.colored(header, AnsiColor::Cyan));
                let fields = provider.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()));
                ui.println(ui.pairs(fields).to_string());
            }
        }
        (FileStatus::Unreadable(reason), _) => {
            ui.err(format!("Cannot read config.toml: {}", reason))
        }
        _ => ui.warn("config.toml is missing"),
    }
    ui.newline();

    // The store is optional here; a missing or broken one just means no match.
    let matched = load_profiles(&paths.store_file)
        .ok()
        .and_then(|loaded| {
            find_active(&loaded.profiles, snapshot.secret.as_deref()).map(|p| p.name.clone())
        });
    match matched {
        Some(name) => ui.ok(format!("Active profile: {}", name)),
        None => ui.info("No profile in the store matches the active API key"),
    }

    Ok(())
}

/// Write an example profile store
pub fn init(paths: &Paths, force: bool, ui: &Ui) -> Result<()> {
    if paths.store_file.exists() && !force {
        bail!(
            "Profile store already exists: {}\nHint: Use 'cxs init --force' to overwrite it.",
            paths.store_file.display()
        );
    }

    paths.ensure_dirs()?;
    write_example_store(&paths.store_file)
        .with_context(|| format!("Failed to write {}", paths.store_file.display()))?;

    ui.ok(format!("Created example store: {}", paths.store_file.display()));
    ui.println("Edit it and fill in each profile's OPENAI_API_KEY, then run:");
    ui.println(format!("  {} list", ui.bold("cxs")));
    Ok(())
}

/// Run diagnostics; fails when any check does
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    if !run_doctor(paths, ui) {
        bail!("doctor found problems");
    }
    Ok(())
}

/// Load the store, print skipped entries, and turn store problems into hints
fn load_store(paths: &Paths, ui: &Ui) -> Result<LoadedProfiles> {
    match load_profiles(&paths.store_file) {
        Ok(loaded) => {
            ui.rejections(&loaded.rejected);
            Ok(loaded)
        }
        Err(err) if err.is_store_problem() => Err(store_error(err, ui)),
        Err(err) => Err(err.into()),
    }
}

fn store_error(err: Error, ui: &Ui) -> anyhow::Error {
    match &err {
        Error::NotFound { .. } => {
            anyhow!("{}\nHint: Run 'cxs init' to create an example store.", err)
        }
        Error::InvalidJson { .. } | Error::NotAnArray { .. } => anyhow!(
            "{}\nHint: The store must be a JSON array of profiles. \
             Run 'cxs init --force' to start over.",
            err
        ),
        Error::EmptyResult { rejected, .. } => {
            ui.rejections(rejected);
            anyhow!("{}\nHint: Fix the entries above or run 'cxs init --force'.", err)
        }
        _ => err.into(),
    }
}

/// Interactive profile selection; `None` when the user cancels
fn select_profile<'a>(
    profiles: &'a [Profile],
    active: Option<&Profile>,
) -> Result<Option<&'a Profile>> {
    const CANCEL: &str = "✖ Cancel";

    let mut options: Vec<String> = profiles
        .iter()
        .enumerate()
        .map(|(index, p)| {
            let marker = if active.is_some_and(|a| a.name == p.name) {
                " (current)"
            } else {
                ""
            };
            format!("{}. {}{} - {}", index + 1, p.name, marker, p.settings.base_url)
        })
        .collect();
    options.push(CANCEL.to_string());

    let starting_cursor = active
        .and_then(|a| profiles.iter().position(|p| p.name == a.name))
        .unwrap_or(0);

    let answer = Select::new("Which profile should codex use?", options.clone())
        .with_page_size(options.len().min(20))
        .with_starting_cursor(starting_cursor)
        .with_help_message("↑↓ to move, Enter to switch, Esc to cancel")
        .prompt();

    let choice = match answer {
        Ok(choice) => choice,
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            return Ok(None);
        }
        Err(e) => return Err(e).context("Profile selection failed"),
    };

    Ok(options
        .iter()
        .position(|opt| *opt == choice)
        .and_then(|idx| profiles.get(idx)))
}

/// Run a switch with a spinner and report what changed
fn activate(paths: &Paths, profile: &Profile, ui: &Ui) -> Result<()> {
    let spinner = ui.spinner(format!("Switching to profile '{}'...", profile.name));

    let report = match switch_to_profile(paths, profile) {
        Ok(report) => {
            ui.finish(&spinner, Status::Ok, format!("Active profile: {}", profile.name));
            report
        }
        Err(e) => {
            ui.finish(&spinner, Status::Err, format!("Failed to switch: {}", e));
            return Err(e.into());
        }
    };

    print_report(ui, profile, &report);
    Ok(())
}

fn print_report(ui: &Ui, profile: &Profile, report: &SwitchReport) {
    for (label, action) in [
        ("auth.json", &report.auth.action),
        ("config.toml", &report.config.action),
    ] {
        ui.file_action(label, action);
    }

    for edit in &report.config.edits {
        tracing::debug!("config.toml: {}", edit);
    }

    let mut rows = vec![
        ("API Key:", ui.secret(&profile.secret, false)),
        ("Base URL:", profile.settings.base_url.clone()),
        (
            "Provider:",
            format!("model_providers.{}", profile.settings.provider_group),
        ),
    ];
    if let Some(dir) = report.backups.first().and_then(|b| b.parent()) {
        rows.push(("Backups:", dir.display().to_string()));
    }
    ui.println(ui.pairs(rows).to_string());
    ui.newline();
    ui.println(ui.dim("Tip: run 'cxs current' to see the full configuration"));
}
