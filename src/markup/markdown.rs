//! Markdown converter using comrak
//!
//! Every conversion builds a fresh parse arena and option set, so footnote and
//! reference definitions from one document never leak into the next.
//!
//! When the metadata extension is enabled the document title is read from,
//! in order of precedence:
//!
//! - YAML front matter delimited by `---`
//! - TOML front matter delimited by `+++`
//! - a leading `Key: value` header block, where a key may carry several
//!   values on indented continuation lines
//!
//! The metadata block is removed from the rendered body.

use std::sync::OnceLock;

use comrak::{format_html, parse_document, Arena, Options};
use log::debug;
use regex::Regex;

use super::converter::{Converter, RenderResult};
use super::dialect::Dialect;
use crate::config::MarkdownOptions;
use crate::error::{Error, Result};

const TITLE_KEY: &str = "title";

// ─────────────────────────────────────────────────────────────────────────────
// Converter
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown adapter backed by comrak.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    options: MarkdownOptions,
}

impl MarkdownConverter {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Convert to comrak Options.
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        options.extension.strikethrough = self.options.strikethrough;
        options.extension.table = self.options.tables;
        options.extension.autolink = self.options.autolink;
        options.extension.tasklist = self.options.tasklist;
        options.extension.superscript = self.options.superscript;
        options.extension.footnotes = self.options.footnotes;
        options.extension.description_lists = self.options.description_lists;
        options.extension.header_ids = self.options.header_ids.clone();

        options.render.unsafe_ = self.options.raw_html;

        options
    }
}

impl Converter for MarkdownConverter {
    fn dialect(&self) -> Dialect {
        Dialect::Markdown
    }

    fn is_available(&self) -> bool {
        true
    }

    fn convert(&self, text: &str) -> Result<RenderResult> {
        let (title, body) = if self.options.metadata {
            split_metadata(text)
        } else {
            (None, text)
        };

        let arena = Arena::new();
        let options = self.to_comrak_options();
        let root = parse_document(&arena, body, &options);

        let mut html = Vec::new();
        format_html(root, &options, &mut html)
            .map_err(|e| Error::conversion(Dialect::Markdown, e.to_string()))?;
        let html = String::from_utf8(html)
            .map_err(|e| Error::conversion(Dialect::Markdown, e.to_string()))?;

        Ok(RenderResult::converted(html, title))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata
// ─────────────────────────────────────────────────────────────────────────────

/// Split leading metadata off `text`, returning the title and the body.
fn split_metadata(text: &str) -> (Option<String>, &str) {
    if let Some((front_matter, body)) = split_front_matter(text, "---", &["---", "..."]) {
        return (yaml_title(front_matter), body);
    }
    if let Some((front_matter, body)) = split_front_matter(text, "+++", &["+++"]) {
        return (toml_title(front_matter), body);
    }
    meta_header(text)
}

/// Split a delimited front matter block from the start of `text`.
///
/// Returns `None` unless both the opening and a closing delimiter line exist.
fn split_front_matter<'a>(
    text: &'a str,
    open: &str,
    close: &[&str],
) -> Option<(&'a str, &'a str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != open {
        return None;
    }

    let content_start = first.len();
    let mut offset = content_start;
    for line in lines {
        if close.contains(&line.trim_end()) {
            return Some((&text[content_start..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn yaml_title(front_matter: &str) -> Option<String> {
    let value: serde_yaml::Value = match serde_yaml::from_str(front_matter) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring unparsable YAML front matter: {}", e);
            return None;
        }
    };
    let mapping = value.as_mapping()?;
    let title = mapping.iter().find_map(|(key, value)| {
        key.as_str()
            .filter(|k| k.eq_ignore_ascii_case(TITLE_KEY))
            .map(|_| value)
    })?;

    match title {
        serde_yaml::Value::String(s) => Some(s.trim().to_string()),
        serde_yaml::Value::Sequence(items) => Some(join_values(
            items.iter().filter_map(|item| item.as_str()),
        )),
        _ => None,
    }
}

fn toml_title(front_matter: &str) -> Option<String> {
    let table = match front_matter.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => {
            debug!("Ignoring unparsable TOML front matter: {}", e);
            return None;
        }
    };
    let title = table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(TITLE_KEY))
        .map(|(_, value)| value)?;

    match title {
        toml::Value::String(s) => Some(s.trim().to_string()),
        toml::Value::Array(items) => Some(join_values(
            items.iter().filter_map(|item| item.as_str()),
        )),
        _ => None,
    }
}

fn join_values<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn meta_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ ]{0,3}([A-Za-z0-9_-]+):\s*(.*)$").expect("valid regex for meta keys")
    })
}

fn meta_more_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ ]{4,}(.*)$").expect("valid regex for meta continuations"))
}

/// Parse a `Key: value` header block.
///
/// The block ends at the first blank line. If the first line is not a key
/// line there is no header and the text is returned untouched.
fn meta_header(text: &str) -> (Option<String>, &str) {
    let mut title_values: Vec<String> = Vec::new();
    let mut current_key: Option<String> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if content.trim().is_empty() {
            offset += line.len();
            break;
        }

        if let Some(caps) = meta_key_regex().captures(content) {
            let key = caps[1].to_lowercase();
            if key == TITLE_KEY {
                title_values.push(caps[2].trim().to_string());
            }
            current_key = Some(key);
        } else if let (Some(caps), Some(key)) =
            (meta_more_regex().captures(content), current_key.as_deref())
        {
            if key == TITLE_KEY {
                title_values.push(caps[1].trim().to_string());
            }
        } else {
            break;
        }
        offset += line.len();
    }

    if current_key.is_none() {
        return (None, text);
    }

    let title = (!title_values.is_empty())
        .then(|| join_values(title_values.iter().map(String::as_str)))
        .filter(|t| !t.is_empty());
    (title, &text[offset..])
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(text: &str) -> RenderResult {
        MarkdownConverter::default().convert(text).unwrap()
    }

    #[test]
    fn test_convert_simple_document() {
        let result = convert("# Heading\n\nSome *emphasis* here.");
        assert!(result.body.contains("<h1>Heading</h1>"));
        assert!(result.body.contains("<em>emphasis</em>"));
        assert!(result.title.is_none());
    }

    #[test]
    fn test_convert_gfm_extensions() {
        let result = convert("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(result.body.contains("<table>"));
        assert!(result.body.contains("<del>gone</del>"));
    }

    #[test]
    fn test_meta_header_title() {
        let result = convert("Title: Hello\nAuthor: Me\n\nBody text");
        assert_eq!(result.title.as_deref(), Some("Hello"));
        assert!(result.body.contains("<p>Body text</p>"));
        assert!(!result.body.contains("Author"));
    }

    #[test]
    fn test_meta_header_multiline_title() {
        let (title, body) = meta_header("title: Part one\n    part two\nDate: today\n\nText\n");
        assert_eq!(title.as_deref(), Some("Part one part two"));
        assert_eq!(body, "Text\n");
    }

    #[test]
    fn test_meta_header_absent() {
        let text = "Just a paragraph: with a colon later\n";
        let (title, body) = meta_header(text);
        assert!(title.is_none());
        assert_eq!(body, text);

        let text = "# Heading\nTitle: not metadata\n";
        assert_eq!(meta_header(text), (None, text));
    }

    #[test]
    fn test_yaml_front_matter_title() {
        let result = convert("---\ntitle: From YAML\ntags: [a, b]\n---\n\nContent");
        assert_eq!(result.title.as_deref(), Some("From YAML"));
        assert!(result.body.contains("<p>Content</p>"));
        assert!(!result.body.contains("tags"));
    }

    #[test]
    fn test_yaml_front_matter_title_list() {
        let result = convert("---\nTitle:\n  - Hello\n  - World\n...\nContent");
        assert_eq!(result.title.as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_toml_front_matter_title() {
        let result = convert("+++\ntitle = \"From TOML\"\n+++\nContent");
        assert_eq!(result.title.as_deref(), Some("From TOML"));
        assert!(result.body.contains("<p>Content</p>"));
    }

    #[test]
    fn test_unclosed_front_matter_is_content() {
        assert!(split_front_matter("---\ntitle: x\n", "---", &["---"]).is_none());
    }

    #[test]
    fn test_metadata_disabled() {
        let options = MarkdownOptions {
            metadata: false,
            ..MarkdownOptions::default()
        };
        let result = MarkdownConverter::new(options)
            .convert("Title: Hello\n\nBody")
            .unwrap();
        assert!(result.title.is_none());
        assert!(result.body.contains("Title: Hello"));
    }

    #[test]
    fn test_footnotes_do_not_leak_between_conversions() {
        let converter = MarkdownConverter::default();
        let first = converter
            .convert("Text[^note]\n\n[^note]: The footnote.")
            .unwrap();
        assert!(first.body.contains("The footnote."));

        let second = converter.convert("Other text[^note]").unwrap();
        assert!(!second.body.contains("The footnote."));
        assert!(!second.body.contains("footnote-ref"));
    }

    #[test]
    fn test_reference_links_do_not_leak_between_conversions() {
        let converter = MarkdownConverter::default();
        let first = converter
            .convert("[link][ref]\n\n[ref]: https://example.com")
            .unwrap();
        assert!(first.body.contains("https://example.com"));

        let second = converter.convert("[link][ref]").unwrap();
        assert!(!second.body.contains("https://example.com"));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let text = "Title: Same\n\n* one\n* two\n";
        assert_eq!(convert(text), convert(text));
    }

    #[test]
    fn test_raw_html_switch() {
        assert!(convert("<span>raw</span>").body.contains("<span>raw</span>"));

        let options = MarkdownOptions {
            raw_html: false,
            ..MarkdownOptions::default()
        };
        let result = MarkdownConverter::new(options)
            .convert("<span>raw</span>")
            .unwrap();
        assert!(!result.body.contains("<span>raw</span>"));
    }
}
