//! Raw HTML passthrough

use super::converter::{Converter, RenderResult};
use super::dialect::Dialect;
use crate::error::Result;

/// Shows HTML documents as they are. Always available, never has a title.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlPassthrough;

impl Converter for HtmlPassthrough {
    fn dialect(&self) -> Dialect {
        Dialect::Html
    }

    fn is_available(&self) -> bool {
        true
    }

    fn convert(&self, text: &str) -> Result<RenderResult> {
        Ok(RenderResult::converted(text, None))
    }
}
