//! Presentation sink
//!
//! The surrounding application decides how renders and highlight spans are
//! displayed; the core only pushes them through [`PresentationSink`].

use crate::highlight::HighlightSpan;
use crate::markup::RenderResult;
use crate::session::SessionId;

/// Receiver for everything the core produces for display.
pub trait PresentationSink {
    /// A new preview render for a session.
    fn push_render(&mut self, session: SessionId, result: &RenderResult);

    /// Fresh spans for one block (line) of a session.
    ///
    /// The spans replace whatever was previously shown for that block.
    fn push_highlight_spans(&mut self, session: SessionId, block: usize, spans: &[HighlightSpan]);
}

/// Sink that keeps everything pushed to it, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub renders: Vec<(SessionId, RenderResult)>,
    pub spans: Vec<(SessionId, usize, Vec<HighlightSpan>)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent render pushed for `session`.
    pub fn last_render(&self, session: SessionId) -> Option<&RenderResult> {
        self.renders
            .iter()
            .rev()
            .find(|(id, _)| *id == session)
            .map(|(_, result)| result)
    }

    /// Number of renders pushed for `session`.
    pub fn render_count(&self, session: SessionId) -> usize {
        self.renders.iter().filter(|(id, _)| *id == session).count()
    }

    /// The most recent spans pushed for one block of `session`.
    pub fn block_spans(&self, session: SessionId, block: usize) -> Option<&[HighlightSpan]> {
        self.spans
            .iter()
            .rev()
            .find(|(id, b, _)| *id == session && *b == block)
            .map(|(_, _, spans)| spans.as_slice())
    }

    pub fn clear(&mut self) {
        self.renders.clear();
        self.spans.clear();
    }
}

impl PresentationSink for RecordingSink {
    fn push_render(&mut self, session: SessionId, result: &RenderResult) {
        self.renders.push((session, result.clone()));
    }

    fn push_highlight_spans(&mut self, session: SessionId, block: usize, spans: &[HighlightSpan]) {
        self.spans.push((session, block, spans.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::StyleClass;

    #[test]
    fn test_recording_sink_keeps_latest() {
        let mut sink = RecordingSink::new();
        let a = SessionId(1);
        let b = SessionId(2);
        sink.push_render(a, &RenderResult::plain_text("one"));
        sink.push_render(b, &RenderResult::plain_text("other"));
        sink.push_render(a, &RenderResult::plain_text("two"));

        assert_eq!(sink.render_count(a), 2);
        assert_eq!(sink.last_render(a).unwrap().body, "two");

        let span = HighlightSpan::new(0, 3, StyleClass::Tag);
        sink.push_highlight_spans(a, 4, &[span]);
        assert_eq!(sink.block_spans(a, 4), Some(&[span][..]));
        assert!(sink.block_spans(a, 0).is_none());

        sink.clear();
        assert!(sink.last_render(a).is_none());
    }
}
