//! Converter trait and the startup capability table
//!
//! Each markup dialect is converted by an adapter implementing [`Converter`].
//! The [`ConverterSet`] is built once at startup: adapters whose backing
//! library is compiled out or not installed are replaced by an
//! [`UnavailableConverter`], so every call site checks availability explicitly.

use log::{debug, info};

use super::dialect::{ConverterAvailability, Dialect};
use super::escape_html;
use super::html::HtmlPassthrough;
use crate::config::Settings;
use crate::error::{Error, Result};

/// Warning shown in place of a document that could not be converted.
pub const DEGRADED_MESSAGE: &str =
    "Could not parse file contents, check if you have the necessary module installed!";

// ─────────────────────────────────────────────────────────────────────────────
// Render Result
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a render is real converted content or a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Output of a converter (or literal text display)
    Converted,
    /// Fixed warning shown because conversion was impossible
    Degraded,
}

/// Output of interpreting a document.
///
/// Immutable once produced; the next interpretation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// HTML fragment for the preview body
    pub body: String,
    /// Document title from metadata or document structure
    pub title: Option<String>,
    pub status: RenderStatus,
}

impl RenderResult {
    /// A successfully converted result.
    pub fn converted(body: impl Into<String>, title: Option<String>) -> Self {
        Self {
            body: body.into(),
            title: title.filter(|t| !t.trim().is_empty()),
            status: RenderStatus::Converted,
        }
    }

    /// Literal text, HTML-escaped, without a title.
    pub fn plain_text(source: &str) -> Self {
        Self::converted(escape_html(source), None)
    }

    /// The degraded-mode warning paragraph.
    pub fn degraded() -> Self {
        Self {
            body: format!("<p style=\"color: red\">{}</p>", DEGRADED_MESSAGE),
            title: None,
            status: RenderStatus::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status == RenderStatus::Degraded
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Converter Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Uniform interface over a markup converter.
pub trait Converter {
    /// The dialect this converter handles.
    fn dialect(&self) -> Dialect;

    /// Whether the backing library initialized. Fixed after construction.
    fn is_available(&self) -> bool;

    /// Convert `text` into a render result.
    ///
    /// Each call is independent of every previous call.
    fn convert(&self, text: &str) -> Result<RenderResult>;
}

/// Placeholder for a converter that is compiled out or not installed.
#[derive(Debug, Clone, Copy)]
pub struct UnavailableConverter {
    dialect: Dialect,
}

impl UnavailableConverter {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

impl Converter for UnavailableConverter {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn is_available(&self) -> bool {
        false
    }

    fn convert(&self, _text: &str) -> Result<RenderResult> {
        Err(Error::ConverterUnavailable(self.dialect))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Converter Set
// ─────────────────────────────────────────────────────────────────────────────

/// The process-wide set of converters, resolved once at startup.
pub struct ConverterSet {
    markdown: Box<dyn Converter>,
    rst: Box<dyn Converter>,
    html: Box<dyn Converter>,
    availability: ConverterAvailability,
}

impl ConverterSet {
    /// Probe every optional converter using the given settings.
    pub fn detect(settings: &Settings) -> Self {
        let set = Self::from_converters(detect_markdown(settings), detect_rst(settings));
        info!(
            "Converters available: Markdown={}, reStructuredText={}",
            set.availability.markdown, set.availability.rst
        );
        set
    }

    /// Build a set from explicit Markdown and reST adapters.
    ///
    /// Availability is read from the adapters here and never again.
    pub fn from_converters(markdown: Box<dyn Converter>, rst: Box<dyn Converter>) -> Self {
        let availability = ConverterAvailability {
            markdown: markdown.is_available(),
            rst: rst.is_available(),
        };
        Self {
            markdown,
            rst,
            html: Box::new(HtmlPassthrough),
            availability,
        }
    }

    /// A set with no optional converter (pure HTML mode).
    pub fn unavailable() -> Self {
        Self::from_converters(
            Box::new(UnavailableConverter::new(Dialect::Markdown)),
            Box::new(UnavailableConverter::new(Dialect::ReStructuredText)),
        )
    }

    pub fn availability(&self) -> ConverterAvailability {
        self.availability
    }

    /// Get the converter for `dialect`, if it is available.
    pub fn get(&self, dialect: Dialect) -> Option<&dyn Converter> {
        if !self.availability.is_available(dialect) {
            return None;
        }
        match dialect {
            Dialect::Markdown => Some(self.markdown.as_ref()),
            Dialect::ReStructuredText => Some(self.rst.as_ref()),
            Dialect::Html => Some(self.html.as_ref()),
            Dialect::Unknown => None,
        }
    }
}

#[cfg(feature = "markdown")]
fn detect_markdown(settings: &Settings) -> Box<dyn Converter> {
    Box::new(super::MarkdownConverter::new(settings.markdown.clone()))
}

#[cfg(not(feature = "markdown"))]
fn detect_markdown(_settings: &Settings) -> Box<dyn Converter> {
    debug!("Markdown support not compiled in");
    Box::new(UnavailableConverter::new(Dialect::Markdown))
}

#[cfg(feature = "rst")]
fn detect_rst(settings: &Settings) -> Box<dyn Converter> {
    match super::RstConverter::detect(settings.rst_command.as_deref()) {
        Some(converter) => Box::new(converter.with_timeout(settings.rst_timeout())),
        None => {
            debug!("No docutils rst2html command found");
            Box::new(UnavailableConverter::new(Dialect::ReStructuredText))
        }
    }
}

#[cfg(not(feature = "rst"))]
fn detect_rst(_settings: &Settings) -> Box<dyn Converter> {
    debug!("reStructuredText support not compiled in");
    Box::new(UnavailableConverter::new(Dialect::ReStructuredText))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Converter for Upper {
        fn dialect(&self) -> Dialect {
            Dialect::ReStructuredText
        }

        fn is_available(&self) -> bool {
            true
        }

        fn convert(&self, text: &str) -> Result<RenderResult> {
            Ok(RenderResult::converted(text.to_uppercase(), None))
        }
    }

    #[test]
    fn test_degraded_result_is_red_warning() {
        let result = RenderResult::degraded();
        assert!(result.is_degraded());
        assert!(result.body.starts_with("<p style=\"color: red\">"));
        assert!(result.body.contains(DEGRADED_MESSAGE));
        assert!(result.title.is_none());
    }

    #[test]
    fn test_plain_text_result_is_escaped() {
        let result = RenderResult::plain_text("a < b");
        assert_eq!(result.body, "a &lt; b");
        assert_eq!(result.status, RenderStatus::Converted);
    }

    #[test]
    fn test_blank_title_is_dropped() {
        let result = RenderResult::converted("<p>x</p>", Some("  ".to_string()));
        assert!(result.title.is_none());
    }

    #[test]
    fn test_unavailable_converter_errors() {
        let converter = UnavailableConverter::new(Dialect::Markdown);
        assert!(!converter.is_available());
        assert!(matches!(
            converter.convert("# hi"),
            Err(Error::ConverterUnavailable(Dialect::Markdown))
        ));
    }

    #[test]
    fn test_converter_set_availability_fixed_at_construction() {
        let set = ConverterSet::from_converters(
            Box::new(UnavailableConverter::new(Dialect::Markdown)),
            Box::new(Upper),
        );
        assert_eq!(
            set.availability(),
            ConverterAvailability {
                markdown: false,
                rst: true
            }
        );
        assert!(set.get(Dialect::Markdown).is_none());
        assert!(set.get(Dialect::Unknown).is_none());
        let rst = set.get(Dialect::ReStructuredText).unwrap();
        assert_eq!(rst.convert("abc").unwrap().body, "ABC");
    }

    #[test]
    fn test_html_always_in_set() {
        let set = ConverterSet::unavailable();
        let html = set.get(Dialect::Html).unwrap();
        assert_eq!(html.convert("<b>x</b>").unwrap().body, "<b>x</b>");
    }
}
