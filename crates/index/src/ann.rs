//! Approximate Nearest Neighbor (ANN) search over keyframe embeddings.
//!
//! Candidates come from a Hierarchical Navigable Small World (HNSW) graph once
//! the index is large enough, and from an exact scan otherwise. Either way the
//! returned score is recomputed against the stored vector with the configured
//! [`Metric`], so both paths rank with identical numbers.
//!
//! ## Trade-offs
//!
//! - **Speed**: ~100-1000x faster than linear scan for large datasets
//! - **Recall**: Typically 95-99% (some false negatives possible)
//! - **Memory**: vectors are kept alongside the graph so `reconstruct` never
//!   has to re-encode anything
//!
//! ## When NOT to Use HNSW
//!
//! - Dataset size < 1,000 vectors (linear scan is fine)
//! - Need 100% recall (disable via [`AnnConfig::with_enabled`])

use hashbrown::HashMap;
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{IndexError, Metric, Neighbor, VectorIndex};

/// Configuration for ANN index construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    /// Number of neighbors per node (higher = better recall, slower build).
    /// Default: 16
    pub m: usize,
    /// Size of dynamic candidate list during construction.
    /// Default: 200
    pub ef_construction: usize,
    /// Size of dynamic candidate list during search. Raised to `k` when a
    /// query asks for more neighbors than this.
    /// Default: 64
    pub ef_search: usize,
    /// Whether to use ANN or fall back to linear scan.
    /// Default: true (use ANN when beneficial)
    pub enabled: bool,
    /// Minimum number of vectors before ANN is used.
    /// Default: 1000
    pub min_vectors_for_ann: usize,
    /// Similarity used to score neighbors.
    ///
    /// The HNSW graph always orders candidates by cosine distance; results
    /// are rescored with this metric. Both orders agree only for
    /// unit-normalized vectors, which is what the encoders produce.
    pub metric: Metric,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            enabled: true,
            min_vectors_for_ann: 1000,
            metric: Metric::InnerProduct,
        }
    }
}

impl AnnConfig {
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    pub fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_vectors_for_ann(mut self, min: usize) -> Self {
        self.min_vectors_for_ann = min;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Check if ANN should be used given the current dataset size.
    pub fn should_use_ann(&self, num_vectors: usize) -> bool {
        self.enabled && num_vectors >= self.min_vectors_for_ann
    }
}

/// In-memory vector index keyed by stable `i64` ids.
pub struct AnnIndex {
    config: AnnConfig,
    dimension: usize,
    hnsw: Option<Hnsw<'static, f32, DistCosine>>,
    positions: HashMap<i64, usize>,
    ids: Vec<i64>,
    vectors: Vec<Vec<f32>>,
    built: bool,
}

impl AnnIndex {
    /// Create a new empty ANN index.
    pub fn new(dimension: usize, config: AnnConfig) -> Self {
        Self {
            config,
            dimension,
            hnsw: None,
            positions: HashMap::new(),
            ids: Vec::new(),
            vectors: Vec::new(),
            built: false,
        }
    }

    /// Build an index from `(id, vector)` pairs and construct the graph.
    pub fn from_entries<I>(dimension: usize, config: AnnConfig, entries: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = (i64, Vec<f32>)>,
    {
        let mut index = Self::new(dimension, config);
        for (id, vector) in entries {
            index.insert(id, vector)?;
        }
        index.build();
        Ok(index)
    }

    /// Insert a vector with associated id.
    pub fn insert(&mut self, id: i64, vector: Vec<f32>) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if self.positions.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }

        let position = self.vectors.len();
        self.vectors.push(vector);
        self.ids.push(id);
        self.positions.insert(id, position);

        self.built = false;
        Ok(())
    }

    /// HNSW-based candidate search, rescored exactly.
    fn hnsw_search(
        &self,
        hnsw: &Hnsw<'static, f32, DistCosine>,
        query: &[f32],
        k: usize,
    ) -> Vec<Neighbor> {
        let ef = self.config.ef_search.max(k);
        let candidates: Vec<Neighbour> = hnsw.search(query, k, ef);

        let mut scored: Vec<Neighbor> = candidates
            .into_iter()
            .filter_map(|neighbour| {
                let position = neighbour.get_origin_id();
                self.vectors.get(position).map(|stored| Neighbor {
                    id: self.ids[position],
                    score: self.config.metric.similarity(query, stored),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Linear search (exact, slow but accurate). Equal scores keep insertion order.
    fn linear_search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .zip(self.ids.iter())
            .map(|(stored, &id)| Neighbor {
                id,
                score: self.config.metric.similarity(query, stored),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }

    /// Check if an id is stored.
    pub fn contains(&self, id: i64) -> bool {
        self.positions.contains_key(&id)
    }

    /// Iterate stored `(id, vector)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (i64, &[f32])> + '_ {
        self.ids
            .iter()
            .copied()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    /// Check if HNSW index is built.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Build HNSW index (required before using ANN search).
    /// Only builds the graph if there are enough vectors for HNSW to work properly.
    pub fn build(&mut self) {
        if self.vectors.is_empty() {
            return;
        }

        let nb_elem = self.vectors.len();
        if nb_elem < 10 || !self.config.should_use_ann(nb_elem) {
            self.hnsw = None;
            self.built = true;
            return;
        }

        let nb_layer = 16.min((nb_elem as f32).ln().trunc() as usize).max(1);
        let hnsw = Hnsw::<f32, DistCosine>::new(
            self.config.m,
            nb_elem,
            nb_layer,
            self.config.ef_construction,
            DistCosine {},
        );

        let data_for_insertion: Vec<(&Vec<f32>, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vec)| (vec, position))
            .collect();
        hnsw.parallel_insert(&data_for_insertion);

        tracing::debug!(vectors = nb_elem, layers = nb_layer, "hnsw graph built");
        self.hnsw = Some(hnsw);
        self.built = true;
    }

    /// Rebuild the index (useful after batch insertions).
    pub fn rebuild(&mut self) {
        self.built = false;
        self.build();
    }

    /// Get current configuration.
    pub fn config(&self) -> &AnnConfig {
        &self.config
    }
}

impl VectorIndex for AnnIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        // hnsw_rs sizes its candidate heaps from k
        let k = k.min(self.vectors.len());

        match self.hnsw.as_ref() {
            Some(hnsw) if self.built && self.config.should_use_ann(self.vectors.len()) => {
                Ok(self.hnsw_search(hnsw, query, k))
            }
            _ => Ok(self.linear_search(query, k)),
        }
    }

    fn reconstruct(&self, id: i64) -> Result<Vec<f32>, IndexError> {
        self.positions
            .get(&id)
            .map(|&position| self.vectors[position].clone())
            .ok_or(IndexError::UnknownId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: &[f32]) -> Vec<f32> {
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    }

    #[test]
    fn test_ann_config_defaults() {
        let config = AnnConfig::default();
        assert_eq!(config.m, 16);
        assert_eq!(config.ef_construction, 200);
        assert_eq!(config.ef_search, 64);
        assert!(config.enabled);
        assert_eq!(config.min_vectors_for_ann, 1000);
        assert_eq!(config.metric, Metric::InnerProduct);
    }

    #[test]
    fn test_ann_config_builder() {
        let config = AnnConfig::default()
            .with_m(32)
            .with_ef_construction(400)
            .with_ef_search(100)
            .with_enabled(false)
            .with_min_vectors_for_ann(500)
            .with_metric(Metric::Cosine);

        assert_eq!(config.m, 32);
        assert_eq!(config.ef_construction, 400);
        assert_eq!(config.ef_search, 100);
        assert!(!config.enabled);
        assert_eq!(config.min_vectors_for_ann, 500);
        assert_eq!(config.metric, Metric::Cosine);
    }

    #[test]
    fn test_should_use_ann() {
        let config = AnnConfig::default();
        assert!(config.should_use_ann(1000));
        assert!(!config.should_use_ann(999));

        let disabled_config = AnnConfig::default().with_enabled(false);
        assert!(!disabled_config.should_use_ann(10000));
    }

    #[test]
    fn test_linear_search_orders_by_descending_similarity() {
        let mut index = AnnIndex::new(3, AnnConfig::default());
        index.insert(10, vec![1.0, 0.0, 0.0]).unwrap();
        index.insert(11, vec![0.0, 1.0, 0.0]).unwrap();
        index.insert(12, unit(&[1.0, 1.0, 0.0])).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        let ids: Vec<i64> = results.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![10, 12, 11]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[1].score > results[2].score);
    }

    #[test]
    fn test_equal_scores_keep_insertion_order() {
        let mut index = AnnIndex::new(2, AnnConfig::default());
        index.insert(7, vec![1.0, 0.0]).unwrap();
        index.insert(3, vec![1.0, 0.0]).unwrap();
        index.insert(5, vec![1.0, 0.0]).unwrap();

        let first = index.search(&[1.0, 0.0], 3).unwrap();
        let second = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(first.iter().map(|n| n.id).collect::<Vec<_>>(), vec![7, 3, 5]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = AnnIndex::new(3, AnnConfig::default());
        let result = index.insert(1, vec![1.0, 0.0]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));

        index.insert(1, vec![1.0, 0.0, 0.0]).unwrap();
        let result = index.search(&[1.0, 0.0], 1);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut index = AnnIndex::new(2, AnnConfig::default());
        index.insert(1, vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            index.insert(1, vec![0.0, 1.0]),
            Err(IndexError::DuplicateId(1))
        ));
    }

    #[test]
    fn test_empty_search_and_zero_k() {
        let mut index = AnnIndex::new(3, AnnConfig::default());
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());

        index.insert(1, vec![1.0, 0.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_respects_k() {
        let mut index = AnnIndex::new(3, AnnConfig::default());
        for i in 0..5 {
            index.insert(i, unit(&[1.0, i as f32, 0.5])).unwrap();
        }

        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).unwrap().len(), 5);
    }

    #[test]
    fn test_reconstruct_returns_stored_vector() {
        let mut index = AnnIndex::new(3, AnnConfig::default());
        index.insert(42, vec![0.0, 0.6, 0.8]).unwrap();

        assert_eq!(index.reconstruct(42).unwrap(), vec![0.0, 0.6, 0.8]);
        assert!(matches!(
            index.reconstruct(43),
            Err(IndexError::UnknownId(43))
        ));
    }

    #[test]
    fn test_hnsw_search_finds_exact_match() {
        let config = AnnConfig::default().with_min_vectors_for_ann(1);
        let entries = (0..64).map(|i| {
            let angle = i as f32 * 0.05;
            (i as i64, vec![angle.cos(), angle.sin(), 0.0])
        });
        let index = AnnIndex::from_entries(3, config, entries).unwrap();
        assert!(index.is_built());

        let query = index.reconstruct(20).unwrap();
        let results = index.search(&query, 5).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].id, 20);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_hnsw_search_clamps_oversized_k() {
        let config = AnnConfig::default().with_min_vectors_for_ann(1);
        let entries = (0..64).map(|i| {
            let angle = i as f32 * 0.05;
            (i as i64, vec![angle.cos(), angle.sin(), 0.0])
        });
        let index = AnnIndex::from_entries(3, config, entries).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], usize::MAX).unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= index.len());
        assert_eq!(results[0].id, 0);
    }

    #[test]
    fn test_inner_product_graph_agrees_with_exact_scan_on_unit_vectors() {
        let entries: Vec<(i64, Vec<f32>)> = (0..64)
            .map(|i| {
                let angle = i as f32 * 0.09;
                (i as i64, unit(&[angle.cos(), angle.sin(), 0.3]))
            })
            .collect();
        let graph = AnnIndex::from_entries(
            3,
            AnnConfig::default().with_min_vectors_for_ann(1),
            entries.clone(),
        )
        .unwrap();
        let exact =
            AnnIndex::from_entries(3, AnnConfig::default().with_enabled(false), entries).unwrap();

        for probe in [5_i64, 31, 60] {
            let query = exact.reconstruct(probe).unwrap();
            let from_graph = graph.search(&query, 1).unwrap();
            let from_scan = exact.search(&query, 1).unwrap();
            assert_eq!(from_graph[0].id, from_scan[0].id);
            assert!((from_graph[0].score - from_scan[0].score).abs() < 1e-6);
        }
    }

    #[test]
    fn test_insert_invalidates_build() {
        let mut index = AnnIndex::new(3, AnnConfig::default().with_min_vectors_for_ann(1));
        index.insert(1, vec![1.0, 0.0, 0.0]).unwrap();
        index.build();
        assert!(index.is_built());

        index.insert(2, vec![0.0, 1.0, 0.0]).unwrap();
        assert!(!index.is_built());

        index.rebuild();
        assert!(index.is_built());
    }

    #[test]
    fn test_entries_preserve_insertion_order() {
        let mut index = AnnIndex::new(2, AnnConfig::default());
        index.insert(9, vec![1.0, 0.0]).unwrap();
        index.insert(4, vec![0.0, 1.0]).unwrap();

        let ids: Vec<i64> = index.entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![9, 4]);
        assert!(index.contains(4));
        assert!(!index.contains(5));
    }
}
