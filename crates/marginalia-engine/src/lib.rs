//! Text anchoring over mutable document trees.
//!
//! A selection inside a [`tree::DocumentTree`] is serialized into an
//! [`AnchorDescriptor`] (normalized text plus bounded context) that survives
//! re-rendering, and later resolved back into concrete leaf coordinates by
//! fuzzy, context-aware matching.

pub mod anchoring;
pub mod error;
pub mod navigator;
pub mod store;
pub mod tree;

// Re-export key types for easier usage
pub use anchoring::{
    AnchorDescriptor, AnchorOptions, Anchorer, BatchResolution, Boundary, DEFAULT_CHARS_TO_KEEP,
    MatchStrategy, ResolvedAnchor, ResolvedOffsets, Span, relative_position, resolve_offsets,
};
pub use error::AnchorError;
pub use navigator::{ExclusionRules, LeafOffset, Navigator, normalize_text};
pub use store::{AnchorId, AnchorStore, StoredAnchor};
pub use tree::{DocTree, DocumentTree, NodeId, NodeKind, Visibility};
