/*!
 * # Anchoring
 *
 * Turns a live selection into a position-independent [`AnchorDescriptor`] and
 * back again after the document tree has changed.
 *
 * ## Flow
 *
 * - **Serialize** (`serialize`): clamp the span out of excluded subtrees, trim
 *   edge whitespace, then record the selected normalized text plus up to
 *   `chars_to_keep` characters of normalized context on each side.
 * - **Match** (`resolve`): find the descriptor inside the document's normalized
 *   corpus, dropping context step by step until something matches.
 * - **Map back** (`batch`): convert the matched normalized offsets into leaf
 *   coordinates, for one descriptor or many against a single corpus snapshot.
 *
 * Descriptors are the only thing meant to outlive a tree mutation. [`Span`]s
 * and [`ResolvedAnchor`]s are always derived fresh from the current tree.
 */

pub mod batch;
pub mod resolve;
pub mod serialize;

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::navigator::{ExclusionRules, Navigator};
use crate::tree::DocumentTree;

pub use batch::BatchResolution;
pub use resolve::{MatchStrategy, ResolvedOffsets, relative_position, resolve_offsets};

/// Context length used when none is configured
pub const DEFAULT_CHARS_TO_KEEP: usize = 32;

/// A point between two characters of a text leaf. `offset` is a byte offset
/// into the leaf's raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> Boundary<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A `[start, end)` range over the live tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span<N> {
    pub start: Boundary<N>,
    pub end: Boundary<N>,
}

impl<N> Span<N> {
    pub fn new(start: Boundary<N>, end: Boundary<N>) -> Self {
        Self { start, end }
    }
}

/// Persistable description of a selection: its normalized text and the
/// normalized text around it. Contains no tree coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorDescriptor {
    pub text: String,
    #[serde(default)]
    pub text_before: String,
    #[serde(default)]
    pub text_after: String,
}

impl AnchorDescriptor {
    pub fn new(
        text_before: impl Into<String>,
        text: impl Into<String>,
        text_after: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            text_before: text_before.into(),
            text_after: text_after.into(),
        }
    }
}

/// A descriptor mapped back onto the current tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAnchor<N> {
    pub span: Span<N>,
    /// Start of the match in parts per ten thousand of the corpus, `0..10_000`
    pub relative_position: u16,
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorOptions {
    /// Characters of context kept on each side of a descriptor
    pub chars_to_keep: NonZeroUsize,
    pub rules: ExclusionRules,
}

impl Default for AnchorOptions {
    fn default() -> Self {
        Self {
            chars_to_keep: NonZeroUsize::new(DEFAULT_CHARS_TO_KEEP).unwrap_or(NonZeroUsize::MIN),
            rules: ExclusionRules::default(),
        }
    }
}

/// Entry point for serializing spans and resolving descriptors under one root.
pub struct Anchorer<'t, T: DocumentTree> {
    nav: Navigator<'t, T>,
    root: T::NodeId,
    chars_to_keep: NonZeroUsize,
}

impl<'t, T: DocumentTree> Anchorer<'t, T> {
    pub fn new(tree: &'t T, root: T::NodeId, options: AnchorOptions) -> Self {
        Self {
            nav: Navigator::new(tree, options.rules),
            root,
            chars_to_keep: options.chars_to_keep,
        }
    }

    /// Anchor against the whole document.
    pub fn for_document(tree: &'t T, options: AnchorOptions) -> Self {
        Self::new(tree, tree.root(), options)
    }

    pub fn navigator(&self) -> &Navigator<'t, T> {
        &self.nav
    }

    pub fn root(&self) -> T::NodeId {
        self.root
    }

    pub fn chars_to_keep(&self) -> usize {
        self.chars_to_keep.get()
    }

    /// Normalized text of the anchoring root.
    pub fn corpus(&self) -> String {
        self.nav.normalized_inner_text(self.root)
    }

    /// Raw visible text covered by `span`.
    ///
    /// Returns `None` when the end is not reachable from the start by walking
    /// visible leaves forward (end before start, or a stale endpoint).
    pub fn span_text(&self, span: &Span<T::NodeId>) -> Option<String> {
        let tree = self.nav.tree();
        let start_text = tree.text(span.start.node)?;
        if span.start.node == span.end.node {
            let covered = start_text.get(span.start.offset..span.end.offset);
            return Some(covered.unwrap_or_default().to_string());
        }

        let mut out = start_text.get(span.start.offset..)?.to_string();
        let mut ptr = span.start.node;
        loop {
            ptr = self.nav.next_text_leaf(ptr)?;
            let text = tree.text(ptr)?;
            if ptr == span.end.node {
                out.push_str(text.get(..span.end.offset)?);
                return Some(out);
            }
            out.push_str(text);
        }
    }

    /// Move the start past leading whitespace and the end before trailing
    /// whitespace.
    ///
    /// An endpoint sitting at the edge of a leaf with nothing but whitespace
    /// left on its side moves on to the neighbouring visible leaf, so a
    /// boundary mapped to the end of an earlier leaf still lands on text.
    /// Neither endpoint moves past the other's leaf.
    pub(crate) fn trim_whitespace(&self, mut span: Span<T::NodeId>) -> Span<T::NodeId> {
        let tree = self.nav.tree();

        while let Some(rest) = tree
            .text(span.start.node)
            .and_then(|text| text.get(span.start.offset..))
        {
            let trimmed = rest.trim_start();
            span.start.offset += rest.len() - trimmed.len();
            if !trimmed.is_empty() || span.start.node == span.end.node {
                break;
            }
            let Some(next) = self.nav.next_text_leaf(span.start.node) else {
                break;
            };
            span.start = Boundary::new(next, 0);
        }

        while let Some(head) = tree
            .text(span.end.node)
            .and_then(|text| text.get(..span.end.offset))
        {
            span.end.offset = head.trim_end().len();
            if span.end.offset > 0 || span.end.node == span.start.node {
                break;
            }
            let Some(previous) = self.nav.previous_text_leaf(span.end.node) else {
                break;
            };
            span.end = Boundary::new(previous, tree.text(previous).map_or(0, str::len));
        }

        span
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::DocTree;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_descriptor_wire_names() {
        let descriptor = AnchorDescriptor::new("quick", "brown", "fox");

        insta::assert_yaml_snapshot!(descriptor, @r"
        text: brown
        textBefore: quick
        textAfter: fox
        ");
    }

    #[test]
    fn test_descriptor_context_defaults_to_empty() {
        let descriptor: AnchorDescriptor = serde_json::from_str(r#"{"text":"cat"}"#).unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("", "cat", ""));
    }

    #[test]
    fn test_span_text_crosses_leaves() {
        let mut tree = DocTree::default();
        let a = tree.append_text(tree.root(), "one two");
        let hidden = tree.append_element(tree.root(), "style");
        tree.append_text(hidden, "p {}");
        let b = tree.append_text(tree.root(), " three four");
        let anchorer = Anchorer::for_document(&tree, AnchorOptions::default());

        let span = Span::new(Boundary::new(a, 4), Boundary::new(b, 6));

        assert_eq!(anchorer.span_text(&span).as_deref(), Some("two three"));
    }

    #[test]
    fn test_span_text_backwards_is_none() {
        let mut tree = DocTree::default();
        let a = tree.append_text(tree.root(), "one");
        let b = tree.append_text(tree.root(), "two");
        let anchorer = Anchorer::for_document(&tree, AnchorOptions::default());

        let span = Span::new(Boundary::new(b, 0), Boundary::new(a, 3));

        assert_eq!(anchorer.span_text(&span), None);
    }

    #[test]
    fn test_trim_whitespace_within_leaf() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "  two words  ");
        let anchorer = Anchorer::for_document(&tree, AnchorOptions::default());

        let trimmed =
            anchorer.trim_whitespace(Span::new(Boundary::new(leaf, 0), Boundary::new(leaf, 13)));

        assert_eq!(trimmed, Span::new(Boundary::new(leaf, 2), Boundary::new(leaf, 11)));
    }

    #[test]
    fn test_trim_whitespace_moves_start_to_next_leaf() {
        // <strong>heron</strong> waited in
        let mut tree = DocTree::default();
        let strong = tree.append_element(tree.root(), "strong");
        let heron = tree.append_text(strong, "heron");
        let rest = tree.append_text(tree.root(), " waited in");
        let anchorer = Anchorer::for_document(&tree, AnchorOptions::default());

        let trimmed =
            anchorer.trim_whitespace(Span::new(Boundary::new(heron, 5), Boundary::new(rest, 8)));

        assert_eq!(trimmed, Span::new(Boundary::new(rest, 1), Boundary::new(rest, 7)));
        assert_eq!(anchorer.span_text(&trimmed).as_deref(), Some("waited"));
    }

    #[test]
    fn test_trim_whitespace_moves_end_to_previous_leaf() {
        let mut tree = DocTree::default();
        let word = tree.append_text(tree.root(), "waited ");
        let hidden = tree.append_element(tree.root(), "script");
        tree.append_text(hidden, "x");
        let after = tree.append_text(tree.root(), "  more");
        let anchorer = Anchorer::for_document(&tree, AnchorOptions::default());

        let trimmed =
            anchorer.trim_whitespace(Span::new(Boundary::new(word, 0), Boundary::new(after, 2)));

        assert_eq!(trimmed, Span::new(Boundary::new(word, 0), Boundary::new(word, 6)));
    }

    #[test]
    fn test_trim_whitespace_does_not_cross_endpoints() {
        let mut tree = DocTree::default();
        let a = tree.append_text(tree.root(), "x   ");
        let b = tree.append_text(tree.root(), "  y");
        tree.append_text(tree.root(), " z");
        let anchorer = Anchorer::for_document(&tree, AnchorOptions::default());

        let trimmed = anchorer.trim_whitespace(Span::new(Boundary::new(a, 1), Boundary::new(b, 2)));

        // Whitespace-only selection collapses inside the end leaf
        assert_eq!(trimmed, Span::new(Boundary::new(b, 2), Boundary::new(b, 0)));
        assert_eq!(anchorer.span_text(&trimmed).as_deref(), Some(""));
    }
}
