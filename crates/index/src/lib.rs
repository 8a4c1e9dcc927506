//! # VKIS Index
//!
//! This crate holds the read-mostly retrieval structures behind keyframe
//! search: an approximate nearest-neighbor index over unit-normalized
//! embeddings and the table mapping internal ids to keyframe storage paths.
//!
//! ## Core Features
//!
//! - **Vector search**: [`AnnIndex`] answers top-k queries with an HNSW graph
//!   for large collections and an exact scan for small ones. Scores are
//!   similarities (higher is closer) under the configured [`Metric`].
//! - **Reconstruction**: stored vectors can be read back by id, so
//!   "more like this frame" queries never re-run the encoder.
//! - **Snapshots**: [`IndexSnapshot`] persists an index as a zstd-compressed
//!   bincode payload and rebuilds the graph on load.
//! - **Id map**: [`IdPathMap`] resolves internal ids to storage paths; ids
//!   missing from the map are dropped from results by callers.
//!
//! The [`VectorIndex`] trait is the seam the search service consumes, so a
//! different ANN implementation can be slotted in without touching callers.
//!
//! ## Example Usage
//!
//! ```
//! use index::{AnnConfig, AnnIndex, VectorIndex};
//!
//! let entries = vec![(0_i64, vec![1.0, 0.0]), (1, vec![0.0, 1.0])];
//! let ann = AnnIndex::from_entries(2, AnnConfig::default(), entries).unwrap();
//!
//! let hits = ann.search(&[1.0, 0.0], 1).unwrap();
//! assert_eq!(hits[0].id, 0);
//! ```

pub mod ann;
mod id_map;
mod snapshot;

pub use crate::ann::{AnnConfig, AnnIndex};
pub use crate::id_map::IdPathMap;
pub use crate::snapshot::{IndexSnapshot, INDEX_SCHEMA_VERSION};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Similarity used to score neighbors. Both agree on unit-normalized vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Raw dot product.
    #[default]
    InnerProduct,
    /// Dot product divided by both norms.
    Cosine,
}

impl Metric {
    /// Similarity between two equal-length vectors (higher = closer).
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        match self {
            Metric::InnerProduct => dot,
            Metric::Cosine => {
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 0.0;
                }
                (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
            }
        }
    }
}

/// One neighbor returned by a vector search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Internal id of the stored vector.
    pub id: i64,
    /// Similarity to the query (higher = closer).
    pub score: f32,
}

/// Read-only nearest-neighbor capability consumed by the search service.
///
/// Implementations must be safe to query from many threads at once; nothing
/// in the retrieval path mutates an index after it is loaded.
pub trait VectorIndex: Send + Sync {
    /// Dimensionality every query vector must have.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-`k` neighbors of `query`, ordered by descending score.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError>;

    /// Stored vector for `id`.
    fn reconstruct(&self, id: i64) -> Result<Vec<f32>, IndexError>;
}

/// Errors raised by index construction, loading and queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("id {0} is not stored in the index")]
    UnknownId(i64),
    #[error("id {0} is already stored in the index")]
    DuplicateId(i64),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("unsupported snapshot schema version {0}")]
    UnsupportedSchema(u16),
    #[error("io error: {0}")]
    Io(String),
    #[error("id map error: {0}")]
    IdMap(String),
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::Io(e.to_string())
    }
}
