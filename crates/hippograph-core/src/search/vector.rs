//! ANN index over node embeddings (§4.2).
//!
//! Wraps USearch's HNSW implementation. Node ids are HippoGraph's own
//! 64-bit ids, so unlike a generic string-keyed index this one stores the
//! id directly as the usearch key — no separate allocator is needed, only
//! a presence set for `contains`/`remove` bookkeeping and rebuild counting.

use crate::model::NodeId;
use std::collections::HashSet;
use std::path::Path;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

/// Embedding dimensionality. Fixed for the lifetime of a store; changing it
/// requires a full rebuild (§4.2: "on startup the index is rebuilt from the
/// store if its on-disk version mismatches").
pub const DEFAULT_DIMENSIONS: usize = 256;

pub const DEFAULT_CONNECTIVITY: usize = 16;
pub const DEFAULT_EXPANSION_ADD: usize = 128;
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorSearchError {
    #[error("index creation failed: {0}")]
    IndexCreation(String),
    #[error("failed to add vector: {0}")]
    IndexAdd(String),
    #[error("search failed: {0}")]
    IndexSearch(String),
    #[error("persistence failed: {0}")]
    IndexPersistence(String),
    #[error("invalid dimensions: expected {0}, got {1}")]
    InvalidDimensions(usize, usize),
}

#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
    pub metric: MetricKind,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            metric: MetricKind::Cos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorIndexStats {
    pub total_vectors: usize,
    pub dimensions: usize,
    pub connectivity: usize,
    pub memory_bytes: usize,
}

/// Approximate nearest-neighbour index over node embeddings.
///
/// `add`/`remove`/`search` form the ANN contract of §4.2; `rebuild` is
/// exposed via [`VectorIndex::rebuild_from`] rather than a no-arg method
/// since rebuilding always means "from the store," which only the `Store`
/// can provide.
pub struct VectorIndex {
    index: Index,
    config: VectorIndexConfig,
    present: HashSet<NodeId>,
}

impl VectorIndex {
    pub fn new() -> Result<Self, VectorSearchError> {
        Self::with_config(VectorIndexConfig::default())
    }

    pub fn with_config(config: VectorIndexConfig) -> Result<Self, VectorSearchError> {
        let options = IndexOptions {
            dimensions: config.dimensions,
            metric: config.metric,
            quantization: ScalarKind::F32,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };

        let index =
            Index::new(&options).map_err(|e| VectorSearchError::IndexCreation(e.to_string()))?;
        index
            .reserve(16)
            .map_err(|e| VectorSearchError::IndexCreation(e.to_string()))?;

        Ok(Self {
            index,
            config,
            present: HashSet::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn reserve_for_one_more(&self) -> Result<(), VectorSearchError> {
        let capacity = self.index.capacity();
        let size = self.index.size();
        if size >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.index
                .reserve(new_capacity)
                .map_err(|e| VectorSearchError::IndexCreation(e.to_string()))?;
        }
        Ok(())
    }

    /// Add or replace the vector for `id`. Per §4.2, a failed add must not
    /// leave partial state — callers treat this as fatal to the enclosing
    /// write transaction.
    pub fn add(&mut self, id: NodeId, vector: &[f32]) -> Result<(), VectorSearchError> {
        if vector.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.config.dimensions,
                vector.len(),
            ));
        }

        let key = id as u64;
        if self.present.contains(&id) {
            self.index
                .remove(key)
                .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
        } else {
            self.reserve_for_one_more()?;
        }

        self.index
            .add(key, vector)
            .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
        self.present.insert(id);
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<bool, VectorSearchError> {
        if !self.present.remove(&id) {
            return Ok(false);
        }
        self.index
            .remove(id as u64)
            .map_err(|e| VectorSearchError::IndexAdd(e.to_string()))?;
        Ok(true)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.present.contains(&id)
    }

    /// Search for the `limit` nearest neighbours of `query`. Per §4.2,
    /// returning fewer than `limit` candidates is not an error.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(NodeId, f32)>, VectorSearchError> {
        if query.len() != self.config.dimensions {
            return Err(VectorSearchError::InvalidDimensions(
                self.config.dimensions,
                query.len(),
            ));
        }
        if self.is_empty() {
            return Ok(vec![]);
        }

        let results = self
            .index
            .search(query, limit)
            .map_err(|e| VectorSearchError::IndexSearch(e.to_string()))?;

        let mut out = Vec::with_capacity(results.keys.len());
        for (key, distance) in results.keys.iter().zip(results.distances.iter()) {
            // Cosine metric returns a distance in [0, 2]; similarity = 1 - distance.
            out.push((*key as NodeId, 1.0 - distance));
        }
        Ok(out)
    }

    pub fn search_with_threshold(
        &self,
        query: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<(NodeId, f32)>, VectorSearchError> {
        let results = self.search(query, limit)?;
        Ok(results
            .into_iter()
            .filter(|(_, score)| *score >= min_similarity)
            .collect())
    }

    /// Rebuild the index from scratch given the full set of (id, vector)
    /// pairs from the store. Used at startup when the on-disk index version
    /// does not match, and after snapshot restore (§4.1).
    pub fn rebuild_from(
        config: VectorIndexConfig,
        vectors: impl IntoIterator<Item = (NodeId, Vec<f32>)>,
    ) -> Result<Self, VectorSearchError> {
        let mut index = Self::with_config(config)?;
        for (id, vector) in vectors {
            index.add(id, &vector)?;
        }
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<(), VectorSearchError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| VectorSearchError::IndexPersistence("invalid path".to_string()))?;
        self.index
            .save(path_str)
            .map_err(|e| VectorSearchError::IndexPersistence(e.to_string()))
    }

    pub fn stats(&self) -> VectorIndexStats {
        VectorIndexStats {
            total_vectors: self.len(),
            dimensions: self.config.dimensions,
            connectivity: self.config.connectivity,
            memory_bytes: self.index.serialized_length(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vector(seed: f32) -> Vec<f32> {
        (0..DEFAULT_DIMENSIONS)
            .map(|i| ((i as f32 + seed) / DEFAULT_DIMENSIONS as f32).sin())
            .collect()
    }

    #[test]
    fn new_index_is_empty() {
        let index = VectorIndex::new().unwrap();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), DEFAULT_DIMENSIONS);
    }

    #[test]
    fn add_and_search_returns_self_first() {
        let mut index = VectorIndex::new().unwrap();
        let v1 = test_vector(1.0);
        let v2 = test_vector(2.0);
        let v3 = test_vector(100.0);

        index.add(1, &v1).unwrap();
        index.add(2, &v2).unwrap();
        index.add(3, &v3).unwrap();

        assert_eq!(index.len(), 3);
        assert!(index.contains(1));
        assert!(!index.contains(999));

        let results = index.search(&v1, 3).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn remove_drops_from_index() {
        let mut index = VectorIndex::new().unwrap();
        index.add(1, &test_vector(1.0)).unwrap();
        assert!(index.contains(1));
        assert!(index.remove(1).unwrap());
        assert!(!index.contains(1));
        assert!(!index.remove(1).unwrap());
    }

    #[test]
    fn add_twice_updates_not_duplicates() {
        let mut index = VectorIndex::new().unwrap();
        index.add(1, &test_vector(1.0)).unwrap();
        assert_eq!(index.len(), 1);
        index.add(1, &test_vector(2.0)).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let mut index = VectorIndex::new().unwrap();
        let bad = vec![1.0, 2.0, 3.0];
        assert!(index.add(1, &bad).is_err());
    }

    #[test]
    fn search_returns_fewer_than_k_without_erroring() {
        let mut index = VectorIndex::new().unwrap();
        index.add(1, &test_vector(1.0)).unwrap();
        let results = index.search(&test_vector(1.0), 50).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn rebuild_from_reproduces_contents() {
        let vectors = vec![(1, test_vector(1.0)), (2, test_vector(2.0))];
        let index = VectorIndex::rebuild_from(VectorIndexConfig::default(), vectors).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.contains(1) && index.contains(2));
    }
}
