//! Dialect detection and resolution
//!
//! Maps file extensions (or an explicit override) to a markup dialect and
//! combines that with the converter availability table decided at startup.

use std::path::Path;

use crate::config::DefaultMarkup;

// ─────────────────────────────────────────────────────────────────────────────
// Dialect
// ─────────────────────────────────────────────────────────────────────────────

/// Markup dialect a document is interpreted as.
///
/// `Unknown` is a valid, permanent state: either the extension is not
/// recognized or the matching converter is not installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Markdown,
    ReStructuredText,
    Html,
    Unknown,
}

const MARKDOWN_EXTENSIONS: &[&str] = &["re", "md", "markdown", "mdown", "mkd", "mkdn"];
const RST_EXTENSIONS: &[&str] = &["rest", "rst"];
const HTML_EXTENSIONS: &[&str] = &["html", "htm"];

impl Dialect {
    /// Detect the dialect family from a file path based on extension.
    ///
    /// This ignores converter availability.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Detect the dialect family from a file extension string.
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_lowercase();
        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            Self::Markdown
        } else if RST_EXTENSIONS.contains(&ext.as_str()) {
            Self::ReStructuredText
        } else if HTML_EXTENSIONS.contains(&ext.as_str()) {
            Self::Html
        } else {
            Self::Unknown
        }
    }

    /// Extensions recognized for this dialect.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Markdown => MARKDOWN_EXTENSIONS,
            Self::ReStructuredText => RST_EXTENSIONS,
            Self::Html => HTML_EXTENSIONS,
            Self::Unknown => &[],
        }
    }

    /// Get a display name for this dialect.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
            Self::ReStructuredText => "reStructuredText",
            Self::Html => "HTML",
            Self::Unknown => "Unknown",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Override & Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Explicit user choice that takes precedence over the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectOverride {
    /// Show the source literally, no markup conversion
    PlainText,
    /// Interpret as the given dialect
    Dialect(Dialect),
}

/// Outcome of resolving how a document should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Raw passthrough of the literal text
    PlainText,
    /// Convert with the dialect's converter
    Convert(Dialect),
    /// The dialect was recognized but its converter is not available
    Missing(Dialect),
    /// The extension does not belong to any dialect family
    Unrecognized,
}

impl Resolution {
    /// The dialect value this resolution reports.
    ///
    /// Only a convertible dialect is reported as itself, everything else
    /// is `Unknown`.
    pub fn dialect(&self) -> Dialect {
        match self {
            Resolution::Convert(dialect) => *dialect,
            Resolution::PlainText | Resolution::Missing(_) | Resolution::Unrecognized => {
                Dialect::Unknown
            }
        }
    }

    /// Whether the source is treated as markup, converted or not.
    ///
    /// Plain-text mode and unrecognized files are shown as text and get no
    /// structural highlighting.
    pub fn is_markup(&self) -> bool {
        matches!(self, Resolution::Convert(_) | Resolution::Missing(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Availability Table
// ─────────────────────────────────────────────────────────────────────────────

/// Which converters initialized successfully at startup.
///
/// HTML passthrough needs no converter and is always available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConverterAvailability {
    pub markdown: bool,
    pub rst: bool,
}

impl ConverterAvailability {
    /// Every converter available.
    pub fn all() -> Self {
        Self {
            markdown: true,
            rst: true,
        }
    }

    /// No optional converter available (pure HTML mode).
    pub fn none() -> Self {
        Self::default()
    }

    /// Check whether `dialect` can be converted.
    pub fn is_available(&self, dialect: Dialect) -> bool {
        match dialect {
            Dialect::Markdown => self.markdown,
            Dialect::ReStructuredText => self.rst,
            Dialect::Html => true,
            Dialect::Unknown => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves documents to dialects.
///
/// Resolution is a pure function of (extension, override, availability,
/// default preference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectRegistry {
    availability: ConverterAvailability,
    default_markup: DefaultMarkup,
}

impl DialectRegistry {
    pub fn new(availability: ConverterAvailability, default_markup: DefaultMarkup) -> Self {
        Self {
            availability,
            default_markup,
        }
    }

    pub fn availability(&self) -> ConverterAvailability {
        self.availability
    }

    pub fn default_markup(&self) -> DefaultMarkup {
        self.default_markup
    }

    /// Change the preferred dialect for new documents.
    pub fn set_default_markup(&mut self, default_markup: DefaultMarkup) {
        self.default_markup = default_markup;
    }

    /// Resolve a document given its path and optional override.
    pub fn resolve(
        &self,
        path: Option<&Path>,
        dialect_override: Option<DialectOverride>,
    ) -> Resolution {
        match dialect_override {
            Some(DialectOverride::PlainText) => Resolution::PlainText,
            Some(DialectOverride::Dialect(dialect)) => self.check(dialect),
            None => match path {
                Some(path) => self.check(Dialect::from_path(path)),
                None => Resolution::Convert(self.default_dialect()),
            },
        }
    }

    /// Resolve to a plain dialect value.
    ///
    /// With `override_plain_text` set the document is not interpreted at all,
    /// which is reported as `Unknown`.
    pub fn resolve_dialect(&self, path: Option<&Path>, override_plain_text: bool) -> Dialect {
        let dialect_override = override_plain_text.then_some(DialectOverride::PlainText);
        self.resolve(path, dialect_override).dialect()
    }

    /// Dialect used for documents without a file name.
    ///
    /// Falls back to HTML when neither interpreter is installed.
    pub fn default_dialect(&self) -> Dialect {
        let markdown = self.availability.markdown;
        let rst = self.availability.rst;
        match self.default_markup {
            DefaultMarkup::ReStructuredText if rst => Dialect::ReStructuredText,
            _ if markdown => Dialect::Markdown,
            _ if rst => Dialect::ReStructuredText,
            _ => Dialect::Html,
        }
    }

    fn check(&self, dialect: Dialect) -> Resolution {
        match dialect {
            Dialect::Unknown => Resolution::Unrecognized,
            d if self.availability.is_available(d) => Resolution::Convert(d),
            d => Resolution::Missing(d),
        }
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::new(ConverterAvailability::all(), DefaultMarkup::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
