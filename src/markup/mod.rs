//! Markup dialects and converter adapters
//!
//! This module classifies documents into markup dialects and wraps each
//! optional converter behind the uniform [`Converter`] trait:
//!
//! - Markdown via comrak (feature `markdown`)
//! - reStructuredText via an installed docutils (feature `rst`)
//! - raw HTML passthrough (always available)
//!
//! Converter availability is decided once, when the [`ConverterSet`] is built,
//! and never re-checked afterwards.

mod converter;
mod dialect;
mod html;
#[cfg(feature = "markdown")]
mod markdown;
#[cfg(feature = "rst")]
mod rst;

pub use converter::{
    Converter, ConverterSet, RenderResult, RenderStatus, UnavailableConverter,
    DEGRADED_MESSAGE,
};
pub use dialect::{ConverterAvailability, Dialect, DialectOverride, DialectRegistry, Resolution};
pub use html::HtmlPassthrough;
#[cfg(feature = "markdown")]
pub use markdown::MarkdownConverter;
#[cfg(feature = "rst")]
pub use rst::RstConverter;

/// Escape text for safe inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
