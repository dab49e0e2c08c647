//! Block-scoped lexical highlighting
//!
//! Two independent passes run over one block (line) of text:
//!
//! 1. Spell check, only with an active dictionary: every maximal run of word
//!    characters the dictionary rejects gets a `Misspelled` span.
//! 2. Structural: tags, entities, attribute strings and comments, applied in
//!    that fixed order. A later class overlays an earlier one where they
//!    overlap, so a comment is shown as a comment even though it also looks
//!    like a tag.
//!
//! Spell spans are an underline channel and never hide structural styling.
//! All patterns are linear-time; unterminated constructs simply do not match.

use std::sync::OnceLock;

use regex::Regex;

use super::dictionary::Dictionary;

// ─────────────────────────────────────────────────────────────────────────────
// Styles
// ─────────────────────────────────────────────────────────────────────────────

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const DARK_MAGENTA: Rgb = Rgb::new(0x80, 0x00, 0x80);
    pub const DARK_CYAN: Rgb = Rgb::new(0x00, 0x80, 0x80);
    pub const DARK_YELLOW: Rgb = Rgb::new(0x80, 0x80, 0x00);
    pub const GRAY: Rgb = Rgb::new(0xa0, 0xa0, 0xa4);
    pub const RED: Rgb = Rgb::new(0xff, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex notation, e.g. `#800080`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Font weight of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// Visual attributes a span applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanStyle {
    /// Text colour, for structural spans
    pub foreground: Option<Rgb>,
    pub weight: Option<FontWeight>,
    /// Spell-check underline colour
    pub underline: Option<Rgb>,
}

/// What a highlight span marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleClass {
    /// `<...>`
    Tag,
    /// `&...;`
    Entity,
    /// `"..."` inside a tag
    AttributeString,
    /// `<!--...-->`
    Comment,
    /// Word rejected by the dictionary
    Misspelled,
}

impl StyleClass {
    /// Structural classes in the order they are applied.
    pub const STRUCTURAL: [StyleClass; 4] = [
        StyleClass::Tag,
        StyleClass::Entity,
        StyleClass::AttributeString,
        StyleClass::Comment,
    ];

    pub fn is_structural(&self) -> bool {
        !matches!(self, StyleClass::Misspelled)
    }

    pub fn style(&self) -> SpanStyle {
        let structural = |color, weight| SpanStyle {
            foreground: Some(color),
            weight: Some(weight),
            underline: None,
        };
        match self {
            StyleClass::Tag => structural(Rgb::DARK_MAGENTA, FontWeight::Bold),
            StyleClass::Entity => structural(Rgb::DARK_CYAN, FontWeight::Bold),
            StyleClass::AttributeString => structural(Rgb::DARK_YELLOW, FontWeight::Bold),
            StyleClass::Comment => structural(Rgb::GRAY, FontWeight::Normal),
            StyleClass::Misspelled => SpanStyle {
                foreground: None,
                weight: None,
                underline: Some(Rgb::RED),
            },
        }
    }

    /// Short lowercase name, used in CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            StyleClass::Tag => "tag",
            StyleClass::Entity => "entity",
            StyleClass::AttributeString => "attribute",
            StyleClass::Comment => "comment",
            StyleClass::Misspelled => "misspelled",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Spans
// ─────────────────────────────────────────────────────────────────────────────

/// A styled range of a block; offsets are UTF-8 byte offsets into the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HighlightSpan {
    pub start: usize,
    pub len: usize,
    pub class: StyleClass,
}

impl HighlightSpan {
    pub fn new(start: usize, len: usize, class: StyleClass) -> Self {
        Self { start, len, class }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }

    pub fn style(&self) -> SpanStyle {
        self.class.style()
    }
}

/// All spans of one block: spell spans first, then structural spans in
/// application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHighlight {
    spans: Vec<HighlightSpan>,
}

impl BlockHighlight {
    pub fn spans(&self) -> &[HighlightSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The structural class in effect at `offset`; the last covering span wins.
    pub fn structural_style_at(&self, offset: usize) -> Option<StyleClass> {
        self.spans
            .iter()
            .rev()
            .find(|s| s.class.is_structural() && s.contains(offset))
            .map(|s| s.class)
    }

    /// Whether `offset` lies inside a misspelled word.
    pub fn is_misspelled_at(&self, offset: usize) -> bool {
        self.spans
            .iter()
            .any(|s| s.class == StyleClass::Misspelled && s.contains(offset))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("valid regex for words"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^<>]*>").expect("valid regex for tags"))
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[^; ]*;").expect("valid regex for entities"))
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[^"<]*""#).expect("valid regex for attribute strings"))
}

/// What must follow an attribute string: the rest of its tag.
fn tag_rest_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^<]*>").expect("valid regex for tag remainders"))
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<!--[^->]*-->").expect("valid regex for comments"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Passes
// ─────────────────────────────────────────────────────────────────────────────

/// Highlight one block.
///
/// The spell pass runs only with a non-empty dictionary; the structural pass
/// only when `structural` is set.
pub fn highlight_block(
    text: &str,
    dictionary: Option<&dyn Dictionary>,
    structural: bool,
) -> BlockHighlight {
    let mut spans = Vec::new();
    if let Some(dictionary) = dictionary.filter(|d| !d.is_empty()) {
        spell_spans(text, dictionary, &mut spans);
    }
    if structural {
        structural_spans(text, &mut spans);
    }
    BlockHighlight { spans }
}

fn spell_spans(text: &str, dictionary: &dyn Dictionary, spans: &mut Vec<HighlightSpan>) {
    for word in word_regex().find_iter(text) {
        if !dictionary.check(word.as_str()) {
            spans.push(HighlightSpan::new(
                word.start(),
                word.len(),
                StyleClass::Misspelled,
            ));
        }
    }
}

fn structural_spans(text: &str, spans: &mut Vec<HighlightSpan>) {
    for class in StyleClass::STRUCTURAL {
        match class {
            StyleClass::Tag => push_matches(tag_regex(), text, class, spans),
            StyleClass::Entity => push_matches(entity_regex(), text, class, spans),
            StyleClass::AttributeString => attribute_spans(text, spans),
            StyleClass::Comment => push_matches(comment_regex(), text, class, spans),
            StyleClass::Misspelled => {}
        }
    }
}

fn push_matches(re: &Regex, text: &str, class: StyleClass, spans: &mut Vec<HighlightSpan>) {
    spans.extend(
        re.find_iter(text)
            .map(|m| HighlightSpan::new(m.start(), m.len(), class)),
    );
}

/// Quoted strings that are followed by the closing `>` of their tag.
///
/// When the follow-up check fails the search resumes one character after the
/// candidate's opening quote, which is what a lookahead would do.
fn attribute_spans(text: &str, spans: &mut Vec<HighlightSpan>) {
    let mut pos = 0;
    while let Some(candidate) = attribute_regex().find_at(text, pos) {
        if tag_rest_regex().is_match(&text[candidate.end()..]) {
            spans.push(HighlightSpan::new(
                candidate.start(),
                candidate.len(),
                StyleClass::AttributeString,
            ));
            pos = candidate.end();
        } else {
            // The opening quote is a single byte
            pos = candidate.start() + 1;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::WordListDictionary;

    fn structural(text: &str) -> Vec<HighlightSpan> {
        highlight_block(text, None, true).spans().to_vec()
    }

    fn span(start: usize, len: usize, class: StyleClass) -> HighlightSpan {
        HighlightSpan::new(start, len, class)
    }

    #[test]
    fn test_markup_sample() {
        let text = "<b>Hi &amp; bye</b><!-- note -->";
        let block = highlight_block(text, None, true);
        assert_eq!(
            block.spans(),
            &[
                span(0, 3, StyleClass::Tag),
                span(15, 4, StyleClass::Tag),
                span(19, 13, StyleClass::Tag),
                span(6, 5, StyleClass::Entity),
                span(19, 13, StyleClass::Comment),
            ]
        );

        assert_eq!(block.structural_style_at(0), Some(StyleClass::Tag));
        assert_eq!(block.structural_style_at(7), Some(StyleClass::Entity));
        assert_eq!(block.structural_style_at(16), Some(StyleClass::Tag));
        // The comment overlays the tag pattern that also matched it
        assert_eq!(block.structural_style_at(25), Some(StyleClass::Comment));
        assert_eq!(block.structural_style_at(4), None);

        assert_eq!(StyleClass::Comment.style().weight, Some(FontWeight::Normal));
        assert_eq!(StyleClass::Tag.style().weight, Some(FontWeight::Bold));
        assert_eq!(StyleClass::Entity.style().weight, Some(FontWeight::Bold));
    }

    #[test]
    fn test_plain_prose_has_no_spans() {
        assert!(structural("Just some plain prose, nothing else.").is_empty());
        assert!(structural("").is_empty());
    }

    #[test]
    fn test_attribute_string_inside_tag() {
        let text = r#"<a href="x.html">link</a>"#;
        let spans = structural(text);
        assert!(spans.contains(&span(8, 8, StyleClass::AttributeString)));
        let block = highlight_block(text, None, true);
        assert_eq!(
            block.structural_style_at(10),
            Some(StyleClass::AttributeString)
        );
    }

    #[test]
    fn test_quoted_text_outside_tag_is_not_attribute() {
        let spans = structural(r#"He said "hello" to me."#);
        assert!(spans.is_empty());

        // Followed by another tag opening before any '>'
        let spans = structural(r#""quoted" <b>"#);
        assert!(!spans.iter().any(|s| s.class == StyleClass::AttributeString));
    }

    #[test]
    fn test_attribute_string_requires_tag_close() {
        // `" x "` meets a '<' before any '>', `" y"` sits inside a tag
        let text = r#"a " x " <i " y">"#;
        let spans: Vec<_> = structural(text)
            .into_iter()
            .filter(|s| s.class == StyleClass::AttributeString)
            .collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].start..spans[0].end()], r#"" y""#);
    }

    #[test]
    fn test_malformed_constructs_do_not_match() {
        assert!(structural("<unterminated tag").is_empty());
        assert!(structural("AT&T rocks").is_empty());
        assert!(structural("<!-- open comment").is_empty());
        let spans = structural("a < b > c");
        assert_eq!(spans, vec![span(2, 5, StyleClass::Tag)]);
    }

    #[test]
    fn test_multibyte_text_offsets() {
        let text = "ære <b>ø</b>";
        let spans = structural(text);
        assert_eq!(&text[spans[0].start..spans[0].end()], "<b>");
        assert_eq!(&text[spans[1].start..spans[1].end()], "</b>");
    }

    #[test]
    fn test_spell_spans_underline_only_rejected_words() {
        let dict = WordListDictionary::from_words("en_US", ["this", "is", "fine"]);
        let block = highlight_block("this is fnie", Some(&dict), true);
        assert_eq!(block.spans(), &[span(8, 4, StyleClass::Misspelled)]);
        assert!(block.is_misspelled_at(9));
        assert!(!block.is_misspelled_at(0));
        assert_eq!(StyleClass::Misspelled.style().underline, Some(Rgb::RED));
    }

    #[test]
    fn test_affixed_forms_are_not_underlined() {
        let aff = "SET UTF-8\nSFX S Y 1\nSFX S 0 s .\nSFX D Y 1\nSFX D 0 ed [^e]\n";
        let dic = "3\ncat/S\nwalk/D\nthe\n";
        let dict = crate::highlight::HunspellDictionary::parse("en_US", aff, dic).unwrap();

        assert!(highlight_block("the cats walked", Some(&dict), false).is_empty());
        let block = highlight_block("the catz walked", Some(&dict), false);
        assert_eq!(block.spans(), &[span(4, 4, StyleClass::Misspelled)]);
    }

    #[test]
    fn test_spell_and_structural_overlap_both_emitted() {
        let dict = WordListDictionary::from_words("en_US", ["x"]);
        let block = highlight_block("<blink>", Some(&dict), true);
        assert_eq!(
            block.spans(),
            &[
                span(1, 5, StyleClass::Misspelled),
                span(0, 7, StyleClass::Tag),
            ]
        );
        assert!(block.is_misspelled_at(2));
        assert_eq!(block.structural_style_at(2), Some(StyleClass::Tag));
    }

    #[test]
    fn test_no_dictionary_no_underlines() {
        let block = highlight_block("qwzx blargh zzyzx", None, true);
        assert!(block.is_empty());
    }

    #[test]
    fn test_empty_dictionary_disables_spell_pass() {
        let dict = WordListDictionary::from_words("en_US", Vec::<&str>::new());
        let block = highlight_block("qwzx blargh", Some(&dict), true);
        assert!(block.is_empty());
    }

    #[test]
    fn test_structural_pass_can_be_skipped() {
        let block = highlight_block("<b>bold</b>", None, false);
        assert!(block.is_empty());
    }

    #[test]
    fn test_rgb_hex() {
        assert_eq!(Rgb::DARK_MAGENTA.to_hex(), "#800080");
    }
}
