//! Splits a markdown document into independently speakable fragments.
//!
//! Code is never spoken: fenced blocks and inline code spans are removed
//! before the text is split on blank lines. Heading lines are skipped.

use crate::text::language::{Language, detect_language};
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("hardcoded fenced code pattern"));

#[allow(clippy::expect_used)]
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("hardcoded inline code pattern"));

// Two or more newlines, whitespace-only lines in between count as blank.
#[allow(clippy::expect_used)]
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("hardcoded blank line pattern"));

/// One speakable unit of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Position among the document's fragments (dense, 0-based).
    pub index: usize,
    /// Trimmed, non-empty text.
    pub text: String,
    /// Dominant language of `text`.
    pub language: Language,
}

impl Fragment {
    /// Creates a fragment and detects its language.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let language = detect_language(&text);
        Self {
            index,
            text,
            language,
        }
    }
}

/// A document prepared for fragmenting.
///
/// Holds the text with code removed; [`Document::fragments`] can be called
/// any number of times and always yields the same sequence.
#[derive(Debug, Clone)]
pub struct Document {
    cleaned: String,
}

impl Document {
    pub fn new(raw: &str) -> Self {
        let normalized = raw.replace("\r\n", "\n");
        let without_blocks = FENCED_CODE.replace_all(&normalized, "");
        let cleaned = INLINE_CODE.replace_all(&without_blocks, "");
        Self {
            cleaned: cleaned.trim().to_string(),
        }
    }

    /// Lazily iterate over the document's fragments in document order.
    pub fn fragments(&self) -> Fragments<'_> {
        Fragments {
            blocks: BLANK_LINES.split(&self.cleaned),
            next_index: 0,
        }
    }
}

/// Iterator over the fragments of a [`Document`].
pub struct Fragments<'a> {
    blocks: regex::Split<'static, 'a>,
    next_index: usize,
}

impl Iterator for Fragments<'_> {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        for block in self.blocks.by_ref() {
            let text = block.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let fragment = Fragment::new(self.next_index, text);
            self.next_index += 1;
            return Some(fragment);
        }
        None
    }
}

/// Convenience: collect every fragment of `raw`.
pub fn split_fragments(raw: &str) -> Vec<Fragment> {
    Document::new(raw).fragments().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(raw: &str) -> Vec<String> {
        split_fragments(raw).into_iter().map(|f| f.text).collect()
    }

    #[test]
    fn splits_on_blank_lines() {
        assert_eq!(
            texts("First paragraph.\n\nSecond paragraph.\n\n\nThird."),
            vec!["First paragraph.", "Second paragraph.", "Third."]
        );
    }

    #[test]
    fn single_paragraph_yields_one_fragment() {
        assert_eq!(
            texts("One line\nand its continuation"),
            vec!["One line\nand its continuation"]
        );
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        assert_eq!(texts("A.\n   \nB.\n\t\n\nC."), vec!["A.", "B.", "C."]);
    }

    #[test]
    fn headings_are_skipped() {
        assert_eq!(
            texts("# Title\n\nBody.\n\n## Section\n\nMore body."),
            vec!["Body.", "More body."]
        );
    }

    #[test]
    fn fenced_code_blocks_are_removed() {
        let raw = "Before.\n\n```rust\nfn main() {}\n\nlet x = 1;\n```\n\nAfter.";
        assert_eq!(texts(raw), vec!["Before.", "After."]);
    }

    #[test]
    fn inline_code_is_removed() {
        assert_eq!(
            texts("Call `cargo build` to compile."),
            vec!["Call  to compile."]
        );
    }

    #[test]
    fn only_code_and_headings_yields_nothing() {
        let raw = "# Title\n\n```\ncode\n```\n\n## Other\n\n`inline`";
        assert!(split_fragments(raw).is_empty());
    }

    #[test]
    fn empty_document_yields_nothing() {
        assert!(split_fragments("").is_empty());
        assert!(split_fragments("\n\n   \n").is_empty());
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        let fragments = split_fragments("# H\n\nA.\n\n```\nx\n```\n\nB.\n\n# H2\n\nC.");
        let indices: Vec<usize> = fragments.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["A.", "B.", "C."]);
    }

    #[test]
    fn fragments_are_trimmed_and_non_empty() {
        for fragment in split_fragments("  padded  \n\n\n  also padded\t\n\n  ") {
            assert!(!fragment.text.is_empty());
            assert_eq!(fragment.text, fragment.text.trim());
        }
    }

    #[test]
    fn crlf_line_endings_are_normalized() {
        assert_eq!(texts("A.\r\n\r\nB."), vec!["A.", "B."]);
    }

    #[test]
    fn fragments_can_be_restarted() {
        let doc = Document::new("A.\n\nB.\n\nC.");
        let first: Vec<Fragment> = doc.fragments().collect();
        let second: Vec<Fragment> = doc.fragments().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn fragments_are_lazy() {
        let doc = Document::new("A.\n\nB.\n\nC.");
        let mut iter = doc.fragments();
        assert_eq!(iter.next().map(|f| f.text), Some("A.".to_string()));
        assert_eq!(iter.next().map(|f| f.index), Some(1));
    }

    #[test]
    fn scenario_title_english_russian() {
        let fragments = split_fragments("# Title\n\nHello world.\n\nThis is ru: Привет мир.");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].text, "Hello world.");
        assert_eq!(fragments[0].language, Language::English);
        assert_eq!(fragments[1].text, "This is ru: Привет мир.");
        assert_eq!(fragments[1].language, Language::Russian);
    }
}
