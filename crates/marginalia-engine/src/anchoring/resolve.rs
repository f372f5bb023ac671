use crate::navigator::normalize_text;

use super::AnchorDescriptor;

/// Which parts of a descriptor were required to match.
///
/// Tried in [`MatchStrategy::ORDER`]: the most context first, so that a match
/// is as specific as the current document allows. Within a strategy the first
/// occurrence wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// `text_before + text + text_after`
    Full,
    /// `text + text_after`
    TextAndAfter,
    /// `text_before + text`
    BeforeAndText,
    /// `text` alone
    TextOnly,
}

impl MatchStrategy {
    pub const ORDER: [MatchStrategy; 4] = [
        MatchStrategy::Full,
        MatchStrategy::TextAndAfter,
        MatchStrategy::BeforeAndText,
        MatchStrategy::TextOnly,
    ];

    pub fn includes_before(self) -> bool {
        matches!(self, MatchStrategy::Full | MatchStrategy::BeforeAndText)
    }

    pub fn includes_after(self) -> bool {
        matches!(self, MatchStrategy::Full | MatchStrategy::TextAndAfter)
    }
}

/// Where a descriptor's `text` sits in a corpus, in normalized byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOffsets {
    pub start: usize,
    pub end: usize,
    pub strategy: MatchStrategy,
}

/// Locate `descriptor` inside the normalized `corpus`.
///
/// Descriptor fields are normalized again before searching so hand-written
/// or raw descriptors behave like serialized ones. `None` means the anchor is
/// orphaned: the document changed too much around it, or `text` is empty.
pub fn resolve_offsets(corpus: &str, descriptor: &AnchorDescriptor) -> Option<ResolvedOffsets> {
    let text = normalize_text(&descriptor.text);
    if text.is_empty() {
        return None;
    }
    let before = normalize_text(&descriptor.text_before);
    let after = normalize_text(&descriptor.text_after);

    for strategy in MatchStrategy::ORDER {
        let mut needle = String::with_capacity(before.len() + text.len() + after.len());
        if strategy.includes_before() {
            needle.push_str(&before);
        }
        needle.push_str(&text);
        if strategy.includes_after() {
            needle.push_str(&after);
        }

        if let Some(index) = corpus.find(&needle) {
            let start = index + if strategy.includes_before() { before.len() } else { 0 };
            log::debug!("anchor {text:?} matched at {start} via {strategy:?}");
            return Some(ResolvedOffsets {
                start,
                end: start + text.len(),
                strategy,
            });
        }
    }

    log::debug!("anchor {text:?} matched no strategy");
    None
}

/// `offset` as parts per ten thousand of `corpus_len`, clamped to `0..10_000`.
///
/// Both arguments must use the same unit. Resolution passes `char` counts so
/// the value does not depend on how many bytes each character takes.
pub fn relative_position(offset: usize, corpus_len: usize) -> u16 {
    if corpus_len == 0 {
        return 0;
    }
    let scaled = (offset as u128 * 10_000) / corpus_len as u128;
    scaled.min(9_999) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn descriptor(before: &str, text: &str, after: &str) -> AnchorDescriptor {
        AnchorDescriptor::new(before, text, after)
    }

    #[test]
    fn test_full_context_match() {
        let corpus = "thequickbrownfoxjumps";

        let found = resolve_offsets(corpus, &descriptor("quick", "brown", "fox")).unwrap();

        assert_eq!(
            found,
            ResolvedOffsets {
                start: 8,
                end: 13,
                strategy: MatchStrategy::Full
            }
        );
        assert_eq!(&corpus[found.start..found.end], "brown");
        assert_eq!(relative_position(found.start, corpus.len()), 3809);
    }

    #[rstest]
    #[case::full("xxxcatyyy", 3, MatchStrategy::Full)]
    #[case::before_edited("zzzcatyyy", 3, MatchStrategy::TextAndAfter)]
    #[case::after_edited("xxxcatzzz", 3, MatchStrategy::BeforeAndText)]
    #[case::both_edited("aacatbb", 2, MatchStrategy::TextOnly)]
    fn test_context_fallback(
        #[case] corpus: &str,
        #[case] start: usize,
        #[case] strategy: MatchStrategy,
    ) {
        let found = resolve_offsets(corpus, &descriptor("xxx", "cat", "yyy")).unwrap();

        assert_eq!(
            found,
            ResolvedOffsets {
                start,
                end: start + 3,
                strategy
            }
        );
    }

    #[test]
    fn test_stronger_context_beats_earlier_occurrence() {
        // "cat" appears first without context, later with matching context
        let corpus = "catdogxxxcatyyy";

        let found = resolve_offsets(corpus, &descriptor("xxx", "cat", "yyy")).unwrap();

        assert_eq!(found.start, 9);
        assert_eq!(found.strategy, MatchStrategy::Full);
    }

    #[test]
    fn test_first_occurrence_wins_within_strategy() {
        let corpus = "catmatcatbatcat";

        let found = resolve_offsets(corpus, &descriptor("", "cat", "")).unwrap();

        assert_eq!(found.start, 0);
        assert_eq!(found.strategy, MatchStrategy::Full);
    }

    #[test]
    fn test_text_only_picks_first_of_repeated_phrases() {
        let found = resolve_offsets("onecattwocat", &descriptor("xxx", "cat", "yyy")).unwrap();

        assert_eq!(found.start, 3);
        assert_eq!(found.strategy, MatchStrategy::TextOnly);
    }

    #[rstest]
    #[case::missing("the quick fox", "brown")]
    #[case::empty("anything", "")]
    #[case::whitespace_only("anything", "  \n ")]
    fn test_unresolvable(#[case] corpus: &str, #[case] text: &str) {
        let corpus = normalize_text(corpus);

        assert_eq!(resolve_offsets(&corpus, &descriptor("", text, "")), None);
    }

    #[test]
    fn test_raw_descriptor_fields_are_normalized() {
        let found = resolve_offsets(
            "helloworldagain",
            &descriptor("Hello ", " WORLD", "\tAgain"),
        )
        .unwrap();

        assert_eq!((found.start, found.end), (5, 10));
        assert_eq!(found.strategy, MatchStrategy::Full);
    }

    #[rstest]
    #[case(0, 21, 0)]
    #[case(9, 21, 4285)]
    #[case(20, 21, 9523)]
    #[case(5, 0, 0)]
    #[case(10, 10, 9999)]
    fn test_relative_position(#[case] offset: usize, #[case] len: usize, #[case] expected: u16) {
        assert_eq!(relative_position(offset, len), expected);
    }
}
