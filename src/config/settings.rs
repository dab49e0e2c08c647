//! User settings and preferences for retext-core
//!
//! This module defines the `Settings` struct that holds every user-configurable
//! option the interpretation core reads, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Default Markup Preference
// ─────────────────────────────────────────────────────────────────────────────

/// Which interpreter new, unsaved documents prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultMarkup {
    #[default]
    Markdown,
    #[serde(rename = "restructuredtext")]
    ReStructuredText,
}

impl DefaultMarkup {
    /// Get a display label for the preference.
    pub fn label(&self) -> &'static str {
        match self {
            DefaultMarkup::Markdown => "Markdown",
            DefaultMarkup::ReStructuredText => "reStructuredText",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Markdown Options
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration options for Markdown conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable task lists (- [ ] and - [x])
    pub tasklist: bool,
    /// Enable superscript (^text^)
    pub superscript: bool,
    /// Enable footnotes
    pub footnotes: bool,
    /// Enable description lists
    pub description_lists: bool,
    /// Read document metadata (front matter or `Key: value` header) for titles
    pub metadata: bool,
    /// Pass raw HTML in the source through to the output
    pub raw_html: bool,
    /// Prefix for generated heading IDs (None disables heading IDs)
    pub header_ids: Option<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            tasklist: true,
            superscript: false,
            footnotes: true,
            description_lists: false,
            metadata: true,
            // Markdown documents routinely embed HTML, the preview shows it
            raw_html: true,
            header_ids: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences read by the interpretation core.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Interpretation
    // ─────────────────────────────────────────────────────────────────────────
    /// Dialect preferred for new documents that have no file name yet
    pub default_markup: DefaultMarkup,

    /// Markdown extension switches
    pub markdown: MarkdownOptions,

    /// Explicit path to a docutils `rst2html` executable (searched on PATH if unset)
    pub rst_command: Option<PathBuf>,

    /// Seconds a docutils run may take before it is killed
    pub rst_timeout_secs: u64,

    /// Extension appended to Markdown files saved without one
    pub default_markdown_extension: String,

    // ─────────────────────────────────────────────────────────────────────────
    // Preview
    // ─────────────────────────────────────────────────────────────────────────
    /// Whether new sessions start with live preview enabled
    pub live_preview: bool,

    /// Debounce delay between the first edit and the live preview refresh
    pub preview_delay_ms: u64,

    // ─────────────────────────────────────────────────────────────────────────
    // Spell Check
    // ─────────────────────────────────────────────────────────────────────────
    /// Whether spell checking is enabled
    pub spell_check: bool,

    /// Dictionary locale, e.g. `en_US` (None uses the system locale)
    pub spell_locale: Option<String>,

    /// Extra directories searched for `<locale>.dic` word lists
    pub dictionary_dirs: Vec<PathBuf>,

    // ─────────────────────────────────────────────────────────────────────────
    // Session & History
    // ─────────────────────────────────────────────────────────────────────────
    /// Write modified documents that have a file name after each edit and on close
    pub auto_save: bool,

    /// Recently opened files (most recent first)
    pub recent_files: Vec<PathBuf>,

    /// Maximum number of recent files to remember
    pub max_recent_files: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Interpretation
            default_markup: DefaultMarkup::default(),
            markdown: MarkdownOptions::default(),
            rst_command: None,
            rst_timeout_secs: 10,
            default_markdown_extension: String::from("mkd"),

            // Preview
            live_preview: false,
            preview_delay_ms: 1000,

            // Spell Check
            spell_check: false,
            spell_locale: None,
            dictionary_dirs: Vec::new(),

            // Session & History
            auto_save: false,
            recent_files: Vec::new(),
            max_recent_files: 10,
        }
    }
}

impl Settings {
    /// Add a file to the recent files list.
    ///
    /// If the file already exists in the list, it's moved to the front.
    /// The list is trimmed to `max_recent_files`.
    pub fn add_recent_file(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| p != &path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(self.max_recent_files);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum allowed preview debounce delay.
    pub const MIN_PREVIEW_DELAY_MS: u64 = 50;
    /// Maximum allowed preview debounce delay.
    pub const MAX_PREVIEW_DELAY_MS: u64 = 10_000;
    /// Bounds for the docutils run timeout.
    pub const MIN_RST_TIMEOUT_SECS: u64 = 1;
    pub const MAX_RST_TIMEOUT_SECS: u64 = 300;
    /// Upper bound for the recent files list.
    pub const MAX_RECENT_FILES: usize = 100;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        self.preview_delay_ms = self
            .preview_delay_ms
            .clamp(Self::MIN_PREVIEW_DELAY_MS, Self::MAX_PREVIEW_DELAY_MS);
        self.rst_timeout_secs = self
            .rst_timeout_secs
            .clamp(Self::MIN_RST_TIMEOUT_SECS, Self::MAX_RST_TIMEOUT_SECS);

        if self.max_recent_files == 0 {
            self.max_recent_files = 10;
        } else if self.max_recent_files > Self::MAX_RECENT_FILES {
            self.max_recent_files = Self::MAX_RECENT_FILES;
        }
        self.recent_files.truncate(self.max_recent_files);

        let ext = self
            .default_markdown_extension
            .trim()
            .trim_start_matches('.')
            .to_string();
        self.default_markdown_extension = if ext.is_empty() {
            String::from("mkd")
        } else {
            ext
        };

        if matches!(self.spell_locale.as_deref(), Some(l) if l.trim().is_empty()) {
            self.spell_locale = None;
        }
    }

    /// Load settings and sanitize them to ensure validity.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// The preview debounce delay as a `Duration`.
    pub fn preview_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.preview_delay_ms)
    }

    /// The docutils run timeout as a `Duration`.
    pub fn rst_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rst_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
