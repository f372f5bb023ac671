use std::collections::BTreeMap;

use crate::error::AnchorError;
use crate::tree::DocumentTree;

use super::{
    AnchorDescriptor, Anchorer, Boundary, ResolvedAnchor, Span, relative_position,
    resolve_offsets,
};

/// Outcome of resolving many descriptors against one corpus snapshot.
///
/// Every input key lands in exactly one of the two maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResolution<N, K = usize> {
    pub resolved: BTreeMap<K, ResolvedAnchor<N>>,
    pub failed: BTreeMap<K, AnchorError>,
}

impl<N, K> Default for BatchResolution<N, K> {
    fn default() -> Self {
        Self {
            resolved: BTreeMap::new(),
            failed: BTreeMap::new(),
        }
    }
}

impl<N, K: Ord> BatchResolution<N, K> {
    pub fn len(&self) -> usize {
        self.resolved.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.failed.is_empty()
    }

    /// Re-key both maps, e.g. from batch indices to store ids.
    pub fn map_keys<J: Ord>(self, mut f: impl FnMut(K) -> J) -> BatchResolution<N, J> {
        BatchResolution {
            resolved: self.resolved.into_iter().map(|(k, v)| (f(k), v)).collect(),
            failed: self.failed.into_iter().map(|(k, v)| (f(k), v)).collect(),
        }
    }
}

impl<T: DocumentTree> Anchorer<'_, T> {
    /// Resolve `descriptors` against a single snapshot of the root's corpus.
    ///
    /// Failures are captured per index and never affect other descriptors.
    pub fn resolve_all(&self, descriptors: &[AnchorDescriptor]) -> BatchResolution<T::NodeId> {
        let corpus = self.corpus();
        let corpus_chars = corpus.chars().count();
        let mut batch = BatchResolution::default();

        for (index, descriptor) in descriptors.iter().enumerate() {
            match self.resolve_in_corpus(&corpus, corpus_chars, descriptor) {
                Ok(anchor) => {
                    batch.resolved.insert(index, anchor);
                }
                Err(err) => {
                    log::debug!("descriptor {index} failed to resolve: {err}");
                    batch.failed.insert(index, err);
                }
            }
        }

        log::debug!(
            "resolved {} of {} descriptors against a corpus of {} bytes",
            batch.resolved.len(),
            descriptors.len(),
            corpus.len()
        );
        batch
    }

    /// Resolve a single descriptor, surfacing its failure as an error.
    pub fn resolve(
        &self,
        descriptor: &AnchorDescriptor,
    ) -> Result<ResolvedAnchor<T::NodeId>, AnchorError> {
        let mut batch = self.resolve_all(std::slice::from_ref(descriptor));
        if let Some(err) = batch.failed.remove(&0) {
            return Err(err);
        }
        batch.resolved.remove(&0).ok_or(AnchorError::AnchorNotFound)
    }

    fn resolve_in_corpus(
        &self,
        corpus: &str,
        corpus_chars: usize,
        descriptor: &AnchorDescriptor,
    ) -> Result<ResolvedAnchor<T::NodeId>, AnchorError> {
        let offsets = resolve_offsets(corpus, descriptor).ok_or(AnchorError::AnchorNotFound)?;
        let start = self.boundary_at(offsets.start)?;
        let end = self.boundary_at(offsets.end)?;
        let start_chars = corpus
            .get(..offsets.start)
            .map_or(0, |head| head.chars().count());

        Ok(ResolvedAnchor {
            span: self.trim_whitespace(Span::new(start, end)),
            relative_position: relative_position(start_chars, corpus_chars),
            strategy: offsets.strategy,
        })
    }

    /// Leaf coordinates of a normalized corpus offset.
    fn boundary_at(&self, offset: usize) -> Result<Boundary<T::NodeId>, AnchorError> {
        let located = self
            .nav
            .locate_at_normalized_offset(self.root, offset)
            .and_then(|found| {
                let raw = self
                    .nav
                    .raw_offset_for_normalized_offset(found.leaf, found.offset)?;
                Ok(Boundary::new(found.leaf, raw))
            });
        // The tree changed under the caller: treat as an orphaned anchor.
        located.map_err(|err| match err {
            AnchorError::StaleNode | AnchorError::NotATextLeaf => AnchorError::AnchorNotFound,
            other => other,
        })
    }
}
