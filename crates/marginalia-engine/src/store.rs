//! In-memory index of anchors by id.
//!
//! Holds descriptors only. Resolved spans are recomputed against the current
//! tree each time (see [`AnchorStore::resolve_all`]) and never cached here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchoring::{AnchorDescriptor, Anchorer, BatchResolution};
use crate::tree::DocumentTree;

/// Unique identifier for a stored anchor
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub Uuid);

impl AnchorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAnchor {
    pub id: AnchorId,
    pub descriptor: AnchorDescriptor,
    /// Free-form annotation attached by the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorStore {
    anchors: BTreeMap<AnchorId, StoredAnchor>,
}

impl AnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: AnchorDescriptor, note: Option<String>) -> AnchorId {
        let id = AnchorId::new();
        self.insert_with_id(id, descriptor, note);
        id
    }

    /// Insert under a caller-chosen id, replacing any anchor already stored there.
    pub fn insert_with_id(
        &mut self,
        id: AnchorId,
        descriptor: AnchorDescriptor,
        note: Option<String>,
    ) -> Option<StoredAnchor> {
        self.anchors.insert(
            id,
            StoredAnchor {
                id,
                descriptor,
                note,
            },
        )
    }

    pub fn get(&self, id: AnchorId) -> Option<&StoredAnchor> {
        self.anchors.get(&id)
    }

    pub fn remove(&mut self, id: AnchorId) -> Option<StoredAnchor> {
        self.anchors.remove(&id)
    }

    /// Drop every anchor, returning the ids that were stored.
    pub fn remove_all(&mut self) -> Vec<AnchorId> {
        std::mem::take(&mut self.anchors).into_keys().collect()
    }

    /// All anchors in id order.
    pub fn list(&self) -> impl Iterator<Item = &StoredAnchor> {
        self.anchors.values()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Resolve every stored anchor against one snapshot of `anchorer`'s tree.
    pub fn resolve_all<T: DocumentTree>(
        &self,
        anchorer: &Anchorer<'_, T>,
    ) -> BatchResolution<T::NodeId, AnchorId> {
        let ids: Vec<AnchorId> = self.anchors.keys().copied().collect();
        let descriptors: Vec<AnchorDescriptor> = self
            .anchors
            .values()
            .map(|stored| stored.descriptor.clone())
            .collect();

        anchorer.resolve_all(&descriptors).map_keys(|index| ids[index])
    }
}
