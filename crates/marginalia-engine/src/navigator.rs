//! Stateless structural queries over a [`DocumentTree`].
//!
//! Every piece of structural knowledge the anchoring core needs goes through
//! [`Navigator`]: which subtrees are excluded, what text a subtree shows, how
//! to step between text leaves, and how to map between offsets in normalized
//! text and raw offsets inside a single leaf.
//!
//! Normalized text (see [`normalize_text`]) is the only search domain. Raw text
//! varies with incidental formatting, normalized text does not.

use serde::{Deserialize, Serialize};

use crate::error::AnchorError;
use crate::tree::{DocumentTree, NodeKind, Visibility};

/// Class name that opts a container out of anchoring
pub const DEFAULT_EXCLUSION_MARKER: &str = "marginalia-exclude";

/// Non-content tags whose text is never part of the document's prose
pub const DEFAULT_EXCLUDED_TAGS: [&str; 4] = ["style", "script", "title", "noscript"];

/// Strip every whitespace character and lowercase the rest.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Byte length `c` contributes to normalized text.
fn normalized_len(c: char) -> usize {
    if c.is_whitespace() {
        0
    } else {
        c.to_lowercase().map(char::len_utf8).sum()
    }
}

/// Which containers are excluded from anchoring besides invisible ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRules {
    pub marker: String,
    /// Compared ASCII case-insensitively
    pub tags: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            marker: DEFAULT_EXCLUSION_MARKER.to_string(),
            tags: DEFAULT_EXCLUDED_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// A position inside a leaf's normalized text, as produced by
/// [`Navigator::locate_at_normalized_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafOffset<N> {
    pub leaf: N,
    pub offset: usize,
}

/// Read-only navigation helper bound to one tree and one set of rules.
pub struct Navigator<'t, T: DocumentTree> {
    tree: &'t T,
    rules: ExclusionRules,
}

impl<'t, T: DocumentTree> Navigator<'t, T> {
    pub fn new(tree: &'t T, rules: ExclusionRules) -> Self {
        Self { tree, rules }
    }

    pub fn tree(&self) -> &'t T {
        self.tree
    }

    pub fn rules(&self) -> &ExclusionRules {
        &self.rules
    }

    /// Whether `node` roots an excluded subtree.
    ///
    /// Text leaves are never excluded themselves; they inherit exclusion from
    /// a container above them.
    pub fn is_excluded(&self, node: T::NodeId) -> bool {
        let Some(NodeKind::Container { tag }) = self.tree.kind(node) else {
            return false;
        };
        if self.tree.visibility(node) != Visibility::Visible {
            return true;
        }
        if self.tree.has_marker(node, &self.rules.marker) {
            return true;
        }
        self.rules.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Concatenated text of every visible leaf under `node`.
    pub fn inner_text(&self, node: T::NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: T::NodeId, out: &mut String) {
        if self.is_excluded(node) {
            return;
        }
        match self.tree.kind(node) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Container { .. }) => {
                for child in self.tree.children(node) {
                    self.collect_text(child, out);
                }
            }
            None => {}
        }
    }

    pub fn normalized_inner_text(&self, node: T::NodeId) -> String {
        normalize_text(&self.inner_text(node))
    }

    /// First visible text leaf in `node`'s subtree, `node` included.
    pub fn first_text_leaf(&self, node: T::NodeId) -> Option<T::NodeId> {
        if self.tree.is_text(node) {
            return Some(node);
        }
        self.tree
            .children(node)
            .filter(|&child| !self.is_excluded(child))
            .find_map(|child| self.first_text_leaf(child))
    }

    /// Last visible text leaf in `node`'s subtree, `node` included.
    pub fn last_text_leaf(&self, node: T::NodeId) -> Option<T::NodeId> {
        if self.tree.is_text(node) {
            return Some(node);
        }
        let mut child = self.tree.last_child(node);
        while let Some(current) = child {
            if !self.is_excluded(current)
                && let Some(leaf) = self.last_text_leaf(current)
            {
                return Some(leaf);
            }
            child = self.tree.previous_sibling(current);
        }
        None
    }

    /// Closest visible text leaf before `node` in document order.
    ///
    /// Walks earlier siblings (skipping excluded ones without descending into
    /// them), then climbs to the parent and repeats until the document start.
    pub fn previous_text_leaf(&self, node: T::NodeId) -> Option<T::NodeId> {
        let mut ptr = Some(node);
        while let Some(current) = ptr {
            let mut sibling = self.tree.previous_sibling(current);
            while let Some(candidate) = sibling {
                if !self.is_excluded(candidate)
                    && let Some(leaf) = self.last_text_leaf(candidate)
                {
                    log::trace!("previous text leaf of {node:?} is {leaf:?}");
                    return Some(leaf);
                }
                sibling = self.tree.previous_sibling(candidate);
            }
            ptr = self.tree.parent(current);
        }
        None
    }

    /// Closest visible text leaf after `node` in document order.
    pub fn next_text_leaf(&self, node: T::NodeId) -> Option<T::NodeId> {
        let mut ptr = Some(node);
        while let Some(current) = ptr {
            let mut sibling = self.tree.next_sibling(current);
            while let Some(candidate) = sibling {
                if !self.is_excluded(candidate)
                    && let Some(leaf) = self.first_text_leaf(candidate)
                {
                    log::trace!("next text leaf of {node:?} is {leaf:?}");
                    return Some(leaf);
                }
                sibling = self.tree.next_sibling(candidate);
            }
            ptr = self.tree.parent(current);
        }
        None
    }

    /// Find the leaf holding normalized offset `offset` of `root`'s corpus.
    ///
    /// Picks the first visible leaf whose cumulative normalized length reaches
    /// `offset`, in one document-order pass over `root`'s subtree. An offset
    /// sitting exactly on a boundary between two leaves resolves to the end of
    /// the earlier one. Leaves contributing no normalized text are skipped so
    /// empty elements never capture an offset.
    pub fn locate_at_normalized_offset(
        &self,
        root: T::NodeId,
        offset: usize,
    ) -> Result<LeafOffset<T::NodeId>, AnchorError> {
        match self.tree.kind(root) {
            Some(NodeKind::Text(_)) => return Ok(LeafOffset { leaf: root, offset }),
            Some(NodeKind::Container { .. }) => {}
            None => return Err(AnchorError::StaleNode),
        }

        let mut cumulative = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            match self.tree.kind(node) {
                Some(NodeKind::Text(text)) => {
                    let size: usize = text.chars().map(normalized_len).sum();
                    if size > 0 && cumulative + size >= offset {
                        return Ok(LeafOffset {
                            leaf: node,
                            offset: offset - cumulative,
                        });
                    }
                    cumulative += size;
                }
                Some(NodeKind::Container { .. }) => {
                    // Reversed so the first child is popped first
                    let mut child = self.tree.last_child(node);
                    while let Some(current) = child {
                        if !self.is_excluded(current) {
                            stack.push(current);
                        }
                        child = self.tree.previous_sibling(current);
                    }
                }
                None => {}
            }
        }

        Err(AnchorError::OffsetOutOfRange {
            offset,
            len: cumulative,
        })
    }

    /// Translate an offset in `leaf`'s normalized text to a raw byte offset.
    ///
    /// Whitespace is skipped, so the returned offset always sits right before
    /// the next non-whitespace character (or at the end of the leaf).
    pub fn raw_offset_for_normalized_offset(
        &self,
        leaf: T::NodeId,
        normalized_offset: usize,
    ) -> Result<usize, AnchorError> {
        let text = self.tree.text(leaf).ok_or(AnchorError::NotATextLeaf)?;
        let mut cumulative = 0;
        for (index, c) in text.char_indices() {
            let len = normalized_len(c);
            if len == 0 {
                continue;
            }
            // A match can begin inside a char whose lowercase form is several
            // chars long; anchor to the start of that raw char.
            if cumulative + len > normalized_offset {
                return Ok(index);
            }
            cumulative += len;
        }
        if cumulative == normalized_offset {
            return Ok(text.len());
        }
        Err(AnchorError::OffsetOutOfRange {
            offset: normalized_offset,
            len: cumulative,
        })
    }

    /// Nearest excluded node among `node` and its ancestors.
    pub fn excluded_ancestor(&self, node: T::NodeId) -> Option<T::NodeId> {
        self.ancestors(node).find(|&n| self.is_excluded(n))
    }

    /// Outermost excluded node among `node` and its ancestors.
    ///
    /// Clamping a span out of nested excluded subtrees has to step past the
    /// outermost one, otherwise the clamped endpoint may land inside it.
    pub fn outermost_excluded_ancestor(&self, node: T::NodeId) -> Option<T::NodeId> {
        self.ancestors(node).filter(|&n| self.is_excluded(n)).last()
    }

    /// `node` followed by each ancestor up to the tree root.
    pub fn ancestors(&self, node: T::NodeId) -> impl Iterator<Item = T::NodeId> + '_ {
        std::iter::successors(Some(node), move |&n| self.tree.parent(n))
    }
}
