use crate::error::AnchorError;
use crate::navigator::normalize_text;
use crate::tree::DocumentTree;

use super::{AnchorDescriptor, Anchorer, Boundary, Span};

impl<T: DocumentTree> Anchorer<'_, T> {
    /// Describe `span` independently of the tree's current structure.
    ///
    /// Returns `Ok(None)` when nothing visible is left after clamping out of
    /// excluded subtrees and trimming whitespace. Errors are reserved for
    /// endpoints that are not valid positions in attached text leaves.
    pub fn serialize(
        &self,
        span: &Span<T::NodeId>,
    ) -> Result<Option<AnchorDescriptor>, AnchorError> {
        self.check_boundary(&span.start)?;
        self.check_boundary(&span.end)?;

        let Some(span) = self.clamp_to_visible(*span) else {
            log::debug!("span lies entirely inside an excluded subtree");
            return Ok(None);
        };
        let span = self.trim_whitespace(span);

        let text = self
            .span_text(&span)
            .map(|raw| normalize_text(&raw))
            .unwrap_or_default();
        if text.is_empty() {
            log::debug!("span has no visible text");
            return Ok(None);
        }

        Ok(Some(AnchorDescriptor {
            text,
            text_before: self.context_before(&span.start),
            text_after: self.context_after(&span.end),
        }))
    }

    fn check_boundary(&self, boundary: &Boundary<T::NodeId>) -> Result<(), AnchorError> {
        let tree = self.nav.tree();
        if !tree.contains(boundary.node) {
            return Err(AnchorError::StaleNode);
        }
        let text = tree.text(boundary.node).ok_or(AnchorError::NotATextLeaf)?;
        if boundary.offset > text.len() || !text.is_char_boundary(boundary.offset) {
            return Err(AnchorError::InvalidOffset {
                offset: boundary.offset,
            });
        }
        Ok(())
    }

    /// Pull endpoints that sit inside excluded subtrees out to the nearest
    /// visible leaf: the start forward, the end backward.
    fn clamp_to_visible(&self, mut span: Span<T::NodeId>) -> Option<Span<T::NodeId>> {
        let hidden_start = self.nav.outermost_excluded_ancestor(span.start.node);
        let hidden_end = self.nav.outermost_excluded_ancestor(span.end.node);

        if let (Some(start), Some(end)) = (hidden_start, hidden_end)
            && start == end
        {
            return None;
        }
        if let Some(hidden) = hidden_start {
            let leaf = self.nav.next_text_leaf(hidden)?;
            span.start = Boundary::new(leaf, 0);
        }
        if let Some(hidden) = hidden_end {
            let leaf = self.nav.previous_text_leaf(hidden)?;
            let len = self.nav.tree().text(leaf).map_or(0, str::len);
            span.end = Boundary::new(leaf, len);
        }
        Some(span)
    }

    /// Up to `chars_to_keep` normalized characters ending right at `start`.
    fn context_before(&self, start: &Boundary<T::NodeId>) -> String {
        let tree = self.nav.tree();
        let keep = self.chars_to_keep.get();
        let head = tree
            .text(start.node)
            .and_then(|text| text.get(..start.offset))
            .unwrap_or_default();

        let mut chunks = vec![normalize_text(head)];
        let mut gathered = chunks[0].chars().count();
        let mut ptr = start.node;
        while gathered < keep {
            let Some(previous) = self.nav.previous_text_leaf(ptr) else {
                break;
            };
            let chunk = normalize_text(tree.text(previous).unwrap_or_default());
            gathered += chunk.chars().count();
            chunks.push(chunk);
            ptr = previous;
        }

        let before: String = chunks.iter().rev().map(String::as_str).collect();
        let skip = gathered.saturating_sub(keep);
        before.chars().skip(skip).collect()
    }

    /// Up to `chars_to_keep` normalized characters starting right at `end`.
    fn context_after(&self, end: &Boundary<T::NodeId>) -> String {
        let tree = self.nav.tree();
        let keep = self.chars_to_keep.get();
        let tail = tree
            .text(end.node)
            .and_then(|text| text.get(end.offset..))
            .unwrap_or_default();

        let mut after = normalize_text(tail);
        let mut gathered = after.chars().count();
        let mut ptr = end.node;
        while gathered < keep {
            let Some(next) = self.nav.next_text_leaf(ptr) else {
                break;
            };
            let chunk = normalize_text(tree.text(next).unwrap_or_default());
            gathered += chunk.chars().count();
            after.push_str(&chunk);
            ptr = next;
        }

        after.chars().take(keep).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use crate::anchoring::{AnchorOptions, Anchorer, Boundary, Span};
    use crate::navigator::DEFAULT_EXCLUSION_MARKER;
    use crate::tree::{DocTree, DocumentTree, NodeId, Visibility};
    use crate::{AnchorDescriptor, AnchorError};
    use pretty_assertions::assert_eq;

    fn options(chars_to_keep: usize) -> AnchorOptions {
        AnchorOptions {
            chars_to_keep: NonZeroUsize::new(chars_to_keep).unwrap(),
            ..AnchorOptions::default()
        }
    }

    fn span(start: NodeId, start_offset: usize, end: NodeId, end_offset: usize) -> Span<NodeId> {
        Span::new(
            Boundary::new(start, start_offset),
            Boundary::new(end, end_offset),
        )
    }

    #[test]
    fn test_serialize_within_one_leaf() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "The Quick Brown Fox Jumps");
        let anchorer = Anchorer::for_document(&tree, options(5));

        let descriptor = anchorer.serialize(&span(leaf, 10, leaf, 15)).unwrap();

        assert_eq!(
            descriptor,
            Some(AnchorDescriptor::new("quick", "brown", "foxju"))
        );
    }

    #[test]
    fn test_context_grows_across_leaves_and_keeps_nearest_chars() {
        let mut tree = DocTree::default();
        let root = tree.root();
        tree.append_text(root, "alpha beta");
        let p = tree.append_element(root, "p");
        let leaf = tree.append_text(p, "gamma");
        tree.append_text(root, "delta");
        tree.append_text(root, "epsilon");
        let anchorer = Anchorer::for_document(&tree, options(7));

        let descriptor = anchorer.serialize(&span(leaf, 0, leaf, 5)).unwrap().unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("phabeta", "gamma", "deltaep"));
    }

    #[test]
    fn test_context_stops_at_document_edges() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "only words");
        let anchorer = Anchorer::for_document(&tree, options(50));

        let descriptor = anchorer.serialize(&span(leaf, 0, leaf, 4)).unwrap().unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("", "only", "words"));
    }

    #[test]
    fn test_edge_whitespace_is_trimmed() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "one   two   three");
        let anchorer = Anchorer::for_document(&tree, options(3));

        let descriptor = anchorer.serialize(&span(leaf, 3, leaf, 12)).unwrap().unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("one", "two", "thr"));
    }

    #[test]
    fn test_whitespace_only_span_is_empty() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "a    b");
        let anchorer = Anchorer::for_document(&tree, options(3));

        assert_eq!(anchorer.serialize(&span(leaf, 1, leaf, 5)).unwrap(), None);
        assert_eq!(anchorer.serialize(&span(leaf, 2, leaf, 2)).unwrap(), None);
    }

    #[test]
    fn test_span_inside_excluded_subtree_is_empty() {
        let mut tree = DocTree::default();
        tree.append_text(tree.root(), "visible");
        let script = tree.append_element(tree.root(), "script");
        let a = tree.append_text(script, "let a = 1;");
        let inner = tree.append_element(script, "span");
        let b = tree.append_text(inner, "let b = 2;");
        let anchorer = Anchorer::for_document(&tree, options(5));

        assert_eq!(anchorer.serialize(&span(a, 0, b, 5)).unwrap(), None);
    }

    #[test]
    fn test_span_straddling_hidden_start_is_clamped_forward() {
        let mut tree = DocTree::default();
        let root = tree.root();
        tree.append_text(root, "before");
        let hidden = tree.append_element(root, "div");
        tree.set_visibility(hidden, Visibility::DisplayNone);
        let secret = tree.append_text(hidden, "secret");
        let shown = tree.append_text(root, "shown text");
        let anchorer = Anchorer::for_document(&tree, options(6));

        let descriptor = anchorer.serialize(&span(secret, 2, shown, 5)).unwrap().unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("before", "shown", "text"));
    }

    #[test]
    fn test_span_straddling_hidden_end_is_clamped_backward() {
        let mut tree = DocTree::default();
        let root = tree.root();
        let shown = tree.append_text(root, "shown text");
        let hidden = tree.append_element(root, "aside");
        tree.add_class(hidden, DEFAULT_EXCLUSION_MARKER);
        let secret = tree.append_text(hidden, "secret");
        tree.append_text(root, "after");
        let anchorer = Anchorer::for_document(&tree, options(6));

        let descriptor = anchorer.serialize(&span(shown, 6, secret, 3)).unwrap().unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("shown", "text", "after"));
    }

    #[test]
    fn test_hidden_content_between_endpoints_is_left_out() {
        let mut tree = DocTree::default();
        let root = tree.root();
        let a = tree.append_text(root, "left ");
        let style = tree.append_element(root, "style");
        tree.append_text(style, "body { color: red }");
        let b = tree.append_text(root, " right");
        let anchorer = Anchorer::for_document(&tree, options(4));

        let descriptor = anchorer.serialize(&span(a, 0, b, 6)).unwrap().unwrap();

        assert_eq!(descriptor.text, "leftright");
    }

    #[test]
    fn test_context_truncation_counts_chars_not_bytes() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "déjà vu encore");
        let anchorer = Anchorer::for_document(&tree, options(3));

        let descriptor = anchorer.serialize(&span(leaf, 8, leaf, 9)).unwrap().unwrap();

        assert_eq!(descriptor, AnchorDescriptor::new("jàv", "u", "enc"));
    }

    #[test]
    fn test_invalid_endpoints_are_errors() {
        let mut tree = DocTree::default();
        let p = tree.append_element(tree.root(), "p");
        let leaf = tree.append_text(p, "é");
        let gone = tree.append_text(tree.root(), "gone");
        tree.detach(gone);
        let anchorer = Anchorer::for_document(&tree, options(3));

        assert_eq!(
            anchorer.serialize(&span(p, 0, leaf, 1)),
            Err(AnchorError::NotATextLeaf)
        );
        assert_eq!(
            anchorer.serialize(&span(leaf, 1, leaf, 2)),
            Err(AnchorError::InvalidOffset { offset: 1 })
        );
        assert_eq!(
            anchorer.serialize(&span(leaf, 0, leaf, 9)),
            Err(AnchorError::InvalidOffset { offset: 9 })
        );
        assert_eq!(
            anchorer.serialize(&span(gone, 0, gone, 4)),
            Err(AnchorError::StaleNode)
        );
    }

    #[test]
    fn test_root_is_unchanged_by_serialize() {
        let mut tree = DocTree::default();
        let leaf = tree.append_text(tree.root(), "stable");
        let before = tree.len();
        let anchorer = Anchorer::for_document(&tree, options(3));

        anchorer.serialize(&span(leaf, 0, leaf, 6)).unwrap();

        assert_eq!(tree.len(), before);
        assert!(tree.contains(leaf));
    }
}
