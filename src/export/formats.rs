//! Save formats per dialect
//!
//! Default file extensions and save-dialog filter strings for the
//! interpretation a document currently resolves to.

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::markup::{Dialect, Resolution};

const PLAIN_TEXT_FILTER: &str = "Plain text (*.txt)";

/// The dialect a save should be labelled with, if any.
///
/// A recognised dialect whose converter is missing still saves as that
/// dialect; only plain-text mode and unrecognised files fall back to text.
fn save_dialect(resolution: Resolution) -> Option<Dialect> {
    match resolution {
        Resolution::Convert(dialect) | Resolution::Missing(dialect) => Some(dialect),
        Resolution::PlainText | Resolution::Unrecognized => None,
    }
}

/// Extension (without the dot) suggested when saving a document.
pub fn suggested_extension(resolution: Resolution, settings: &Settings) -> String {
    match save_dialect(resolution) {
        Some(Dialect::Markdown) => settings.default_markdown_extension.clone(),
        Some(Dialect::ReStructuredText) => String::from("rst"),
        Some(Dialect::Html) => String::from("html"),
        Some(Dialect::Unknown) | None => String::from("txt"),
    }
}

/// Save-dialog filter string, e.g. `HTML files (*.html *.htm)`.
pub fn file_filter(resolution: Resolution) -> String {
    let dialect = match save_dialect(resolution) {
        Some(dialect) if dialect != Dialect::Unknown => dialect,
        _ => return PLAIN_TEXT_FILTER.to_string(),
    };

    let mut patterns: Vec<String> = dialect
        .extensions()
        .iter()
        .map(|ext| format!("*.{}", ext))
        .collect();
    // Markup sources are often plain .txt files
    if dialect != Dialect::Html {
        patterns.push(String::from("*.txt"));
    }

    let label = match dialect {
        Dialect::Markdown => "Markdown files",
        Dialect::ReStructuredText => "ReStructuredText files",
        _ => "HTML files",
    };
    format!("{} ({})", label, patterns.join(" "))
}

/// Append `extension` to `path` when it has none.
pub fn with_default_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() || extension.is_empty() {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_extension() {
        let mut settings = Settings::default();
        assert_eq!(suggested_extension(Resolution::PlainText, &settings), "txt");
        assert_eq!(suggested_extension(Resolution::Unrecognized, &settings), "txt");
        assert_eq!(
            suggested_extension(Resolution::Convert(Dialect::ReStructuredText), &settings),
            "rst"
        );
        assert_eq!(
            suggested_extension(Resolution::Convert(Dialect::Html), &settings),
            "html"
        );
        assert_eq!(
            suggested_extension(Resolution::Convert(Dialect::Markdown), &settings),
            "mkd"
        );

        settings.default_markdown_extension = String::from("md");
        assert_eq!(
            suggested_extension(Resolution::Missing(Dialect::Markdown), &settings),
            "md"
        );
    }

    #[test]
    fn test_file_filter() {
        assert_eq!(file_filter(Resolution::PlainText), "Plain text (*.txt)");
        assert_eq!(file_filter(Resolution::Unrecognized), "Plain text (*.txt)");
        assert_eq!(
            file_filter(Resolution::Convert(Dialect::ReStructuredText)),
            "ReStructuredText files (*.rest *.rst *.txt)"
        );
        assert_eq!(
            file_filter(Resolution::Convert(Dialect::Html)),
            "HTML files (*.html *.htm)"
        );
        assert_eq!(
            file_filter(Resolution::Missing(Dialect::Markdown)),
            "Markdown files (*.re *.md *.markdown *.mdown *.mkd *.mkdn *.txt)"
        );
    }

    #[test]
    fn test_with_default_extension() {
        assert_eq!(
            with_default_extension(Path::new("/tmp/notes"), "mkd"),
            PathBuf::from("/tmp/notes.mkd")
        );
        assert_eq!(
            with_default_extension(Path::new("/tmp/notes.md"), "mkd"),
            PathBuf::from("/tmp/notes.md")
        );
        assert_eq!(
            with_default_extension(Path::new("notes"), ""),
            PathBuf::from("notes")
        );
    }
}
