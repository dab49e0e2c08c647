//! Document export for retext-core
//!
//! Standalone HTML generation plus the per-dialect save formats used when
//! writing documents back out.

mod formats;
mod html;

pub use formats::{file_filter, suggested_extension, with_default_extension};
pub use html::{export_html, generate_html_document};
