//! Incremental highlighting of whole documents
//!
//! Blocks are lines. For every session the highlighter remembers the text of
//! each block and re-scans only blocks whose text changed since the last
//! update. Switching the structural pass on or off, or any change of the
//! active dictionary, forces a full re-scan.

use std::collections::HashMap;

use log::trace;

use super::dictionary::SpellChecker;
use super::highlighter::{highlight_block, BlockHighlight};
use crate::session::{DocumentSession, SessionId};
use crate::sink::PresentationSink;

#[derive(Debug, Default)]
struct HighlightedDocument {
    blocks: Vec<String>,
    highlights: Vec<BlockHighlight>,
    structural: bool,
    spell_generation: u64,
}

/// Per-session block highlight cache.
#[derive(Debug, Default)]
pub struct DocumentHighlighter {
    documents: HashMap<SessionId, HighlightedDocument>,
}

impl DocumentHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the highlights of `session` up to date and push every block
    /// that was re-scanned.
    ///
    /// Blocks that disappeared get an empty span list so the display can
    /// clear them. Returns the number of blocks re-scanned.
    pub fn update(
        &mut self,
        session: &DocumentSession,
        structural: bool,
        spell: &SpellChecker,
        sink: &mut dyn PresentationSink,
    ) -> usize {
        let id = session.id();
        let document = self.documents.entry(id).or_default();
        let full = document.structural != structural
            || document.spell_generation != spell.generation()
            || document.blocks.is_empty();
        document.structural = structural;
        document.spell_generation = spell.generation();

        let dictionary = spell.dictionary();
        let new_blocks: Vec<&str> = session.text().split('\n').collect();
        let mut rescanned = 0;

        for (index, text) in new_blocks.iter().enumerate() {
            let unchanged = !full && document.blocks.get(index).map(String::as_str) == Some(*text);
            if unchanged {
                continue;
            }

            let highlight = highlight_block(text, dictionary, structural);
            sink.push_highlight_spans(id, index, highlight.spans());
            if index < document.highlights.len() {
                document.highlights[index] = highlight;
                document.blocks[index] = text.to_string();
            } else {
                document.highlights.push(highlight);
                document.blocks.push(text.to_string());
            }
            rescanned += 1;
        }

        for index in new_blocks.len()..document.blocks.len() {
            sink.push_highlight_spans(id, index, &[]);
        }
        document.blocks.truncate(new_blocks.len());
        document.highlights.truncate(new_blocks.len());

        trace!("Re-scanned {} blocks of session {}", rescanned, id);
        rescanned
    }

    /// Current highlights of a session, one entry per block.
    pub fn highlights(&self, session: SessionId) -> Option<&[BlockHighlight]> {
        self.documents
            .get(&session)
            .map(|d| d.highlights.as_slice())
    }

    /// Drop everything remembered about a closed session.
    pub fn forget(&mut self, session: SessionId) {
        self.documents.remove(&session);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
