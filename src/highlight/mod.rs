//! Lexical highlighting for retext-core
//!
//! Markup structure (tags, entities, attribute strings, comments) and
//! spell-check underlines, computed one block at a time.

mod dictionary;
mod document;
mod highlighter;

pub use dictionary::{
    load_dictionary, system_locale, Dictionary, HunspellDictionary, SpellChecker,
    WordListDictionary, FALLBACK_LOCALE,
};
pub use document::DocumentHighlighter;
pub use highlighter::{
    highlight_block, BlockHighlight, FontWeight, HighlightSpan, Rgb, SpanStyle, StyleClass,
};
