//! Targeted text edits to `config.toml`.
//!
//! The file is never parsed into a tree and re-serialized. Instead each edit
//! is a line-anchored match-and-replace on the original text, so comments,
//! formatting and sections this tool does not own survive byte for byte.
//!
//! Two kinds of edit are made:
//!
//! - **Top-level scalars** (`model_provider`, `model`, `model_reasoning_effort`,
//!   `disable_response_storage`): the existing `key = ...` line in the preamble
//!   (the text before the first `[section]` header) is replaced whole. A missing
//!   key is inserted before the first blank line or header, or appended.
//! - **The provider section**: exactly one `[model_providers.<group>]` block is
//!   kept. The first such block is replaced with a freshly rendered one and any
//!   later ones are removed. A missing block goes right before the first
//!   header, or at the end after trailing blank lines are dropped. Each block
//!   ends at the nearest following header of any kind, so unrelated sections
//!   between legacy blocks are left alone.
//!
//! Applying the same settings twice yields byte-identical text.

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::auth::FileAction;
use crate::error::Result;
use crate::fs_utils::{read_if_exists, write_atomic};
use crate::profiles::ProviderSettings;

/// Table holding provider definitions
pub const PROVIDER_TABLE: &str = "model_providers";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[").expect("valid regex"));

static PROVIDER_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\[model_providers\.([^\]\r\n]+)\]").expect("valid regex")
});

static MODEL_PROVIDER_RE: LazyLock<Regex> = LazyLock::new(|| scalar_regex("model_provider"));
static MODEL_RE: LazyLock<Regex> = LazyLock::new(|| scalar_regex("model"));
static REASONING_EFFORT_RE: LazyLock<Regex> =
    LazyLock::new(|| scalar_regex("model_reasoning_effort"));
static DISABLE_STORAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| scalar_regex("disable_response_storage"));

fn scalar_regex(key: &str) -> Regex {
    Regex::new(&format!(r"(?m)^{}[ \t]*=[^\r\n]*", regex::escape(key))).expect("valid regex")
}

/// A top-level scalar owned by a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    ModelProvider,
    Model,
    ReasoningEffort,
    DisableResponseStorage,
}

impl ScalarField {
    /// All fields, in the order they are written
    pub const ALL: [ScalarField; 4] = [
        ScalarField::ModelProvider,
        ScalarField::Model,
        ScalarField::ReasoningEffort,
        ScalarField::DisableResponseStorage,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ScalarField::ModelProvider => "model_provider",
            ScalarField::Model => "model",
            ScalarField::ReasoningEffort => "model_reasoning_effort",
            ScalarField::DisableResponseStorage => "disable_response_storage",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            ScalarField::ModelProvider => &MODEL_PROVIDER_RE,
            ScalarField::Model => &MODEL_RE,
            ScalarField::ReasoningEffort => &REASONING_EFFORT_RE,
            ScalarField::DisableResponseStorage => &DISABLE_STORAGE_RE,
        }
    }

    /// Rendered value, or `None` when the profile leaves this field unset
    fn value(self, settings: &ProviderSettings) -> Option<String> {
        match self {
            ScalarField::ModelProvider => settings.model_provider.as_deref().map(quote),
            ScalarField::Model => settings.model.as_deref().map(quote),
            ScalarField::ReasoningEffort => settings.reasoning_effort.as_deref().map(quote),
            ScalarField::DisableResponseStorage => {
                settings.disable_response_storage.map(|b| b.to_string())
            }
        }
    }

    fn default_value(self) -> String {
        match self {
            ScalarField::DisableResponseStorage => "false".to_string(),
            _ => quote(""),
        }
    }

    fn line(self, value: &str) -> String {
        format!("{} = {}", self.key(), value)
    }
}

/// One change made to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    ScalarReplaced(&'static str),
    ScalarInserted(&'static str),
    /// Existing provider blocks (by group, in document order) collapsed into the new one
    ProviderReplaced { previous: Vec<String> },
    ProviderInserted,
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::ScalarReplaced(key) => write!(f, "updated {key}"),
            Edit::ScalarInserted(key) => write!(f, "added {key}"),
            Edit::ProviderReplaced { previous } => {
                write!(f, "replaced {PROVIDER_TABLE} section(s): {}", previous.join(", "))
            }
            Edit::ProviderInserted => write!(f, "added provider section"),
        }
    }
}

/// Output of [`patch_config`]
#[derive(Debug, Clone)]
pub struct Patched {
    pub text: String,
    /// True when the input was absent or empty and a new document was rendered
    pub created: bool,
    pub edits: Vec<Edit>,
}

/// Apply a profile's settings to existing config text
///
/// Absent or blank input renders a minimal new document instead.
pub fn patch_config(existing: Option<&str>, settings: &ProviderSettings) -> Patched {
    match existing {
        Some(text) if !text.trim().is_empty() => patch_document(text, settings),
        _ => Patched {
            text: render_new_document(settings),
            created: true,
            edits: Vec::new(),
        },
    }
}

/// The four scalar lines, a blank line, then the provider block
pub fn render_new_document(settings: &ProviderSettings) -> String {
    let mut lines: Vec<String> = ScalarField::ALL
        .iter()
        .map(|field| {
            let value = field
                .value(settings)
                .unwrap_or_else(|| field.default_value());
            field.line(&value)
        })
        .collect();
    lines.push(String::new());
    lines.extend(provider_block_lines(settings));
    lines.join("\n")
}

/// Groups of every `[model_providers.<group>]` header, in document order
pub fn provider_groups(text: &str) -> Vec<String> {
    provider_spans(text).into_iter().map(|span| span.group).collect()
}

fn patch_document(text: &str, settings: &ProviderSettings) -> Patched {
    let mut edits = Vec::new();
    let mut text = text.to_string();

    for field in ScalarField::ALL {
        if let Some(value) = field.value(settings) {
            let (patched, edit) = upsert_scalar(&text, field, &field.line(&value));
            text = patched;
            edits.push(edit);
        }
    }

    let (text, edit) = upsert_provider(&text, settings);
    edits.push(edit);

    Patched {
        text,
        created: false,
        edits,
    }
}

fn upsert_scalar(text: &str, field: ScalarField, line: &str) -> (String, Edit) {
    let preamble_end = HEADER_RE.find(text).map_or(text.len(), |m| m.start());

    if let Some(found) = field.pattern().find(&text[..preamble_end]) {
        let mut out = String::with_capacity(text.len() + line.len());
        out.push_str(&text[..found.start()]);
        out.push_str(line);
        out.push_str(&text[found.end()..]);
        return (out, Edit::ScalarReplaced(field.key()));
    }

    let mut lines: Vec<&str> = text.split('\n').collect();
    let index = lines
        .iter()
        .position(|l| l.trim().is_empty() || l.starts_with('['))
        .unwrap_or(lines.len());
    lines.insert(index, line);
    (lines.join("\n"), Edit::ScalarInserted(field.key()))
}

fn upsert_provider(text: &str, settings: &ProviderSettings) -> (String, Edit) {
    let spans = provider_spans(text);

    let Some(first) = spans.first() else {
        return (insert_provider(text, settings), Edit::ProviderInserted);
    };

    // Later blocks go first, back to front, so earlier offsets stay valid.
    let mut out = text.to_string();
    for span in spans[1..].iter().rev() {
        out.replace_range(span.start..span.end, "");
    }

    // Keep the newline in front of a following header so the gap survives.
    let end = if first.end < out.len() {
        first.end - 1
    } else {
        out.len()
    };
    out.replace_range(first.start..end, &provider_block(settings));

    let previous = spans.into_iter().map(|span| span.group).collect();
    (out, Edit::ProviderReplaced { previous })
}

/// Place a new block at the end of the preamble, so nothing the user wrote
/// ends up inside its span
fn insert_provider(text: &str, settings: &ProviderSettings) -> String {
    let block = provider_block(settings);

    if let Some(header) = HEADER_RE.find(text) {
        let (head, rest) = text.split_at(header.start());
        let mut out = String::with_capacity(text.len() + block.len() + 2);
        out.push_str(head);
        if !head.is_empty() && !ends_with_blank_line(head) {
            out.push('\n');
        }
        out.push_str(&block);
        out.push('\n');
        out.push_str(rest);
        return out;
    }

    // No sections: append after the last non-blank line.
    let content_end = text.trim_end().len();
    let line_end = text[content_end..]
        .find('\n')
        .map_or(text.len(), |i| content_end + i);
    let mut out = text[..line_end].to_string();
    out.push_str("\n\n");
    out.push_str(&block);
    out
}

fn ends_with_blank_line(text: &str) -> bool {
    text.ends_with("\n\n") || text.ends_with("\n\r\n")
}

/// Byte range of one provider block: header line through the line before the
/// next header (or end of text)
#[derive(Debug)]
struct ProviderSpan {
    group: String,
    start: usize,
    end: usize,
}

fn provider_spans(text: &str) -> Vec<ProviderSpan> {
    let headers: Vec<usize> = HEADER_RE.find_iter(text).map(|m| m.start()).collect();

    PROVIDER_HEADER_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let start = whole.start();
            let end = headers
                .iter()
                .copied()
                .find(|&h| h > start)
                .unwrap_or(text.len());
            Some(ProviderSpan {
                group: caps[1].to_string(),
                start,
                end,
            })
        })
        .collect()
}

fn provider_block_lines(settings: &ProviderSettings) -> Vec<String> {
    vec![
        format!("[{}.{}]", PROVIDER_TABLE, settings.provider_group),
        format!("name = {}", quote(&settings.provider_name)),
        format!("base_url = {}", quote(&settings.base_url)),
        format!("wire_api = {}", quote(&settings.wire_api)),
        format!("env_key = {}", quote(&settings.env_key)),
        String::new(),
    ]
}

fn provider_block(settings: &ProviderSettings) -> String {
    provider_block_lines(settings).join("\n")
}

/// Render a TOML basic string
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Result of [`update_config_file`]
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub path: PathBuf,
    pub action: FileAction,
    pub edits: Vec<Edit>,
}

/// Patch `config.toml` in place, creating it when absent
///
/// Content that is not UTF-8 text is replaced by a new document and reported
/// as [`FileAction::Recovered`]. Only I/O failures are errors.
pub fn update_config_file(path: &Path, settings: &ProviderSettings) -> Result<ConfigUpdate> {
    let (existing, action) = match read_if_exists(path)? {
        None => (None, FileAction::Created),
        Some(bytes) => match String::from_utf8(bytes) {
            Ok(text) => (Some(text), FileAction::Updated),
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!("cannot read {} as text, rewriting it: {}", path.display(), reason);
                (None, FileAction::Recovered { reason })
            }
        },
    };

    let patched = patch_config(existing.as_deref(), settings);
    for edit in &patched.edits {
        tracing::debug!("{}: {}", path.display(), edit);
    }

    write_atomic(path, patched.text.as_bytes())?;

    Ok(ConfigUpdate {
        path: path.to_path_buf(),
        action,
        edits: patched.edits,
    })
}
