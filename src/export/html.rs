//! HTML Export Generation
//!
//! Wraps a rendered body into a complete, standalone HTML document.

use crate::markup::{escape_html, Dialect, RenderResult, Resolution};

/// Generator tag written into every exported document.
const GENERATOR: &str = concat!("retext ", env!("CARGO_PKG_VERSION"));

/// Generate a complete HTML document around a rendered body.
///
/// The title is escaped; the body is inserted as-is.
pub fn generate_html_document(render: &RenderResult, title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="generator" content="{generator}">
    <title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
        generator = GENERATOR,
        title = escape_html(title),
        body = render.body,
    )
}

/// Text written when a document is exported as HTML.
///
/// HTML documents are already complete, so their source is exported
/// verbatim; everything else is wrapped by `generate_html_document`.
pub fn export_html(
    resolution: Resolution,
    source: &str,
    render: &RenderResult,
    title: &str,
) -> String {
    if resolution == Resolution::Convert(Dialect::Html) {
        format!("{}\n", source)
    } else {
        generate_html_document(render, title)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_html_document() {
        let render = RenderResult::converted("<h1>Test</h1>\n<p>Paragraph text.</p>", None);
        let html = generate_html_document(&render, "Test Doc");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"UTF-8\">"));
        assert!(html.contains(&format!("content=\"{}\"", GENERATOR)));
        assert!(html.contains("<title>Test Doc</title>"));
        assert!(html.contains("<body>\n<h1>Test</h1>\n<p>Paragraph text.</p>\n</body>"));
    }

    #[test]
    fn test_title_is_escaped() {
        let render = RenderResult::converted("<p>x</p>", None);
        let html = generate_html_document(&render, "Fish & <Chips>");
        assert!(html.contains("<title>Fish &amp; &lt;Chips&gt;</title>"));
    }

    #[test]
    fn test_html_dialect_exports_source_verbatim() {
        let source = "<html><body><p>kept</p></body></html>";
        let render = RenderResult::converted(source, None);
        let exported = export_html(Resolution::Convert(Dialect::Html), source, &render, "x");
        assert_eq!(exported, format!("{}\n", source));
    }

    #[test]
    fn test_plain_text_export_is_wrapped() {
        let render = RenderResult::plain_text("a < b");
        let exported = export_html(Resolution::PlainText, "a < b", &render, "notes");
        assert!(exported.contains("<title>notes</title>"));
        assert!(exported.contains("a &lt; b"));
    }
}
