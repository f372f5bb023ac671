//! Host document tree abstraction.
//!
//! The anchoring core never talks to a concrete rendering engine. Anything that
//! can answer the questions in [`DocumentTree`] (structured documents, markup
//! ASTs, a browser DOM behind FFI) can be anchored into.
//!
//! - **`arena`**: [`DocTree`], an owned arena-backed implementation
//! - **`markdown`**: builds a [`DocTree`] from CommonMark source

pub mod arena;
pub mod markdown;

use std::fmt::Debug;
use std::hash::Hash;

pub use arena::{DocTree, NodeId};

/// What a node is, as far as anchoring cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// A node with ordered children and a tag name (`p`, `script`, ...)
    Container { tag: &'a str },
    /// A leaf owning raw text
    Text(&'a str),
}

/// Computed visibility of a node in the host's own styling model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    /// Laid out but not painted (`visibility: hidden`)
    Hidden,
    /// Not laid out at all (`display: none`)
    DisplayNone,
    /// Laid out with no area
    ZeroSize,
}

/// Read-only access to a host tree.
///
/// Navigation is DOM-shaped: parent plus first/last child and sibling links.
/// Implementations must return `None` for nodes they do not (or no longer)
/// contain rather than panic.
pub trait DocumentTree {
    type NodeId: Copy + Eq + Hash + Debug;

    fn root(&self) -> Self::NodeId;

    /// Whether `node` is still attached to this tree.
    fn contains(&self, node: Self::NodeId) -> bool;

    fn kind(&self, node: Self::NodeId) -> Option<NodeKind<'_>>;

    fn parent(&self, node: Self::NodeId) -> Option<Self::NodeId>;
    fn first_child(&self, node: Self::NodeId) -> Option<Self::NodeId>;
    fn last_child(&self, node: Self::NodeId) -> Option<Self::NodeId>;
    fn next_sibling(&self, node: Self::NodeId) -> Option<Self::NodeId>;
    fn previous_sibling(&self, node: Self::NodeId) -> Option<Self::NodeId>;

    fn visibility(&self, node: Self::NodeId) -> Visibility;

    /// Whether `node` carries the exclusion marker (a class name in HTML hosts).
    fn has_marker(&self, node: Self::NodeId, marker: &str) -> bool;

    /// Raw text of a leaf, `None` for containers.
    fn text(&self, node: Self::NodeId) -> Option<&str> {
        match self.kind(node)? {
            NodeKind::Text(text) => Some(text),
            NodeKind::Container { .. } => None,
        }
    }

    fn is_text(&self, node: Self::NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Text(_)))
    }

    /// Children of `node` in document order.
    fn children(&self, node: Self::NodeId) -> Children<'_, Self>
    where
        Self: Sized,
    {
        Children {
            tree: self,
            next: self.first_child(node),
        }
    }
}

/// Iterator over a node's children, see [`DocumentTree::children`].
pub struct Children<'a, T: DocumentTree> {
    tree: &'a T,
    next: Option<T::NodeId>,
}

impl<T: DocumentTree> Iterator for Children<'_, T> {
    type Item = T::NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
