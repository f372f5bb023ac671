use thiserror::Error;

/// Failures of the anchoring core.
///
/// An empty selection is not an error: serialization returns `Ok(None)` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    /// No matching strategy found the anchor in the current document.
    #[error("anchor not found in document")]
    AnchorNotFound,

    /// A normalized offset points past the text it indexes into.
    #[error("normalized offset {offset} out of range (length {len})")]
    OffsetOutOfRange { offset: usize, len: usize },

    /// A span endpoint or mapping target is a container, not a text leaf.
    #[error("node is not a text leaf")]
    NotATextLeaf,

    /// A node is no longer part of the tree.
    #[error("node is no longer attached to the document")]
    StaleNode,

    /// A raw offset is past the end of its leaf or splits a character.
    #[error("raw offset {offset} is not a valid position in its text leaf")]
    InvalidOffset { offset: usize },
}
