//! Terminal output for cxs.
//!
//! Colors are disabled by, in priority order: `--no-color`, a set `NO_COLOR`,
//! `TERM=dumb`, then `--color` (`auto` means "only on a TTY"). Without color,
//! icons fall back to ASCII and tables to markdown borders.
//!
//! Anything that shows a profile or an API key is rendered here, so secrets
//! are masked in one place.

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

use crate::auth::FileAction;
use crate::profiles::{Profile, Rejection, mask_secret};

/// Value of `--color`
#[derive(clap::ValueEnum, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

/// Outcome attached to a line of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Err,
    Info,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warn => "WARN",
            Status::Err => "ERROR",
            Status::Info => "INFO",
        }
    }

    fn color(self) -> AnsiColor {
        match self {
            Status::Ok => AnsiColor::Green,
            Status::Warn => AnsiColor::Yellow,
            Status::Err => AnsiColor::Red,
            Status::Info => AnsiColor::Cyan,
        }
    }

    fn glyph(self, color: bool) -> &'static str {
        match (self, color) {
            (Status::Ok, true) => "✓",
            (Status::Ok, false) => "[OK]",
            (Status::Warn, true) => "⚠",
            (Status::Warn, false) => "[!]",
            (Status::Err, true) => "✗",
            (Status::Err, false) => "[X]",
            (Status::Info, true) => "•",
            (Status::Info, false) => "-",
        }
    }
}

/// Resolved display settings, passed to every command
#[derive(Debug, Clone)]
pub struct Ui {
    color: bool,
    /// Spinners need a TTY as well as color
    spinner: bool,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(ColorMode::Auto, false)
    }
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let color = resolve_color(mode, force_no_color);
        let spinner = color && std::io::stdout().is_terminal();

        if !color {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self { color, spinner }
    }

    // Labelled messages

    /// `TAG message`; errors go to stderr
    pub fn status(&self, status: Status, msg: impl AsRef<str>) {
        let label = self.label_style(status.color());
        let tag = status.tag();
        match status {
            Status::Err => eprintln!("{label}{tag}{label:#} {}", msg.as_ref()),
            _ => println!("{label}{tag}{label:#} {}", msg.as_ref()),
        }
    }

    pub fn ok(&self, msg: impl AsRef<str>) {
        self.status(Status::Ok, msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.status(Status::Warn, msg);
    }

    pub fn err(&self, msg: impl AsRef<str>) {
        self.status(Status::Err, msg);
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.status(Status::Info, msg);
    }

    /// Indented `icon message`, for checklists
    pub fn item(&self, status: Status, msg: impl AsRef<str>) {
        println!("  {} {}", self.icon(status), msg.as_ref());
    }

    /// Like [`Ui::item`], one level deeper
    pub fn sub_item(&self, status: Status, msg: impl AsRef<str>) {
        println!("    {} {}", self.icon(status), msg.as_ref());
    }

    pub fn icon(&self, status: Status) -> &'static str {
        status.glyph(self.color)
    }

    /// Report store entries that were skipped during loading
    pub fn rejections(&self, rejected: &[Rejection]) {
        for rejection in rejected {
            self.warn(format!("Skipping {}", rejection));
        }
    }

    /// Mention what happened to a rewritten file; plain updates stay quiet
    pub fn file_action(&self, label: &str, action: &FileAction) {
        match action {
            FileAction::Created => self.info(format!("Created {}", label)),
            FileAction::Updated => {}
            FileAction::Recovered { reason } => self.warn(format!(
                "{} could not be parsed and was rewritten: {}",
                label, reason
            )),
        }
    }

    // Inline styling

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(s, Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s, Style::new().bold())
    }

    pub fn colored(&self, s: impl AsRef<str>, color: AnsiColor) -> String {
        self.paint(s, Style::new().fg_color(Some(Color::Ansi(color))))
    }

    fn paint(&self, s: impl AsRef<str>, style: Style) -> String {
        if self.color {
            format!("{style}{}{style:#}", s.as_ref())
        } else {
            s.as_ref().to_string()
        }
    }

    fn label_style(&self, color: AnsiColor) -> Style {
        if self.color {
            Style::new().fg_color(Some(Color::Ansi(color))).bold()
        } else {
            Style::new()
        }
    }

    // Secrets and profiles

    /// An API key as it may be shown: masked unless `reveal`
    pub fn secret(&self, secret: &str, reveal: bool) -> String {
        if reveal {
            secret.to_string()
        } else {
            mask_secret(secret)
        }
    }

    /// Numbered profile table with the active one marked
    pub fn profile_table(&self, profiles: &[Profile], active: Option<&Profile>) -> Table {
        let mut table = self.table();
        table.set_header(
            ["#", "", "Profile", "API Key", "Base URL", "Status"]
                .into_iter()
                .map(|title| self.header_cell(title))
                .collect::<Vec<_>>(),
        );

        for (index, profile) in profiles.iter().enumerate() {
            let is_active = active.is_some_and(|a| a.name == profile.name);
            let (marker, status) = if is_active {
                (
                    self.icon(Status::Ok),
                    self.colored_cell("active", AnsiColor::Green),
                )
            } else {
                (" ", Cell::new("-"))
            };

            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(marker),
                Cell::new(&profile.name),
                self.colored_cell(self.secret(&profile.secret, false), AnsiColor::Yellow),
                self.colored_cell(&profile.settings.base_url, AnsiColor::Cyan),
                status,
            ]);
        }

        table
    }

    // Tables

    /// Bordered table; markdown-style borders without color
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(if self.color {
            presets::UTF8_FULL_CONDENSED
        } else {
            presets::ASCII_MARKDOWN
        });
        table
    }

    /// Borderless two-column `key value` listing
    pub fn pairs<K, V>(&self, rows: impl IntoIterator<Item = (K, V)>) -> Table
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(presets::NOTHING);
        for (key, value) in rows {
            table.add_row(vec![Cell::new(key.into()), Cell::new(value.into())]);
        }
        table
    }

    fn header_cell(&self, content: &str) -> Cell {
        let cell = Cell::new(content);
        if self.color {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    /// Colored through comfy-table itself so column widths stay right
    fn colored_cell(&self, content: impl Into<String>, color: AnsiColor) -> Cell {
        let cell = Cell::new(content.into());
        if self.color {
            cell.fg(comfy_color(color))
        } else {
            cell
        }
    }

    // Spinners

    /// Spinner for a switch; hidden unless colors are on and stdout is a TTY
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = if self.spinner {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .template("{spinner:.cyan} {msg}")
                    .expect("valid template"),
            );
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message);
        pb
    }

    /// Replace the spinner with a final status line
    pub fn finish(&self, pb: &ProgressBar, status: Status, msg: impl Into<Cow<'static, str>>) {
        let msg = msg.into();
        if self.spinner {
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{msg}")
                    .expect("valid template"),
            );
            let icon = self.colored(self.icon(status), status.color());
            pb.finish_with_message(format!("{} {}", icon, msg));
        } else {
            pb.finish_and_clear();
            self.status(status, msg);
        }
    }

    // Plain output

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }
}

fn resolve_color(mode: ColorMode, force_no_color: bool) -> bool {
    if force_no_color || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
        return false;
    }

    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}

fn comfy_color(color: AnsiColor) -> comfy_table::Color {
    use comfy_table::Color as C;
    match color {
        AnsiColor::Black => C::Black,
        AnsiColor::Red | AnsiColor::BrightRed => C::Red,
        AnsiColor::Green | AnsiColor::BrightGreen => C::Green,
        AnsiColor::Yellow | AnsiColor::BrightYellow => C::Yellow,
        AnsiColor::Blue | AnsiColor::BrightBlue => C::Blue,
        AnsiColor::Magenta | AnsiColor::BrightMagenta => C::Magenta,
        AnsiColor::Cyan | AnsiColor::BrightCyan => C::Cyan,
        AnsiColor::White | AnsiColor::BrightWhite => C::White,
        AnsiColor::BrightBlack => C::DarkGrey,
    }
}
