use std::fs;
use std::path::Path;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use zstd::{decode_all, encode_all};

use crate::ann::{AnnConfig, AnnIndex};
use crate::{IndexError, Metric, VectorIndex};

/// Bump this value whenever the snapshot layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

/// Zstd level used when callers don't pick one.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SnapshotEntry {
    id: i64,
    vector: Vec<f32>,
}

/// Serializable form of an [`AnnIndex`]: stored vectors only, the graph is
/// rebuilt when the snapshot is turned back into an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    schema_version: u16,
    dimension: usize,
    metric: Metric,
    entries: Vec<SnapshotEntry>,
}

impl IndexSnapshot {
    pub fn from_index(index: &AnnIndex) -> Self {
        Self {
            schema_version: INDEX_SCHEMA_VERSION,
            dimension: index.dimension(),
            metric: index.config().metric,
            entries: index
                .entries()
                .map(|(id, vector)| SnapshotEntry {
                    id,
                    vector: vector.to_vec(),
                })
                .collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild an index. The snapshot's metric wins over `config.metric`.
    pub fn into_index(self, config: AnnConfig) -> Result<AnnIndex, IndexError> {
        let config = config.with_metric(self.metric);
        AnnIndex::from_entries(
            self.dimension,
            config,
            self.entries.into_iter().map(|e| (e.id, e.vector)),
        )
    }

    /// Encodes and compresses the snapshot.
    pub fn encode(&self, level: i32) -> Result<Vec<u8>, IndexError> {
        let encoded =
            encode_to_vec(self, standard()).map_err(|e| IndexError::Snapshot(e.to_string()))?;
        encode_all(encoded.as_slice(), level).map_err(|e| IndexError::Snapshot(e.to_string()))
    }

    /// Decompresses and decodes a snapshot produced by [`encode`](Self::encode).
    pub fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        let decompressed = decode_all(bytes).map_err(|e| IndexError::Snapshot(e.to_string()))?;
        let (snapshot, _): (IndexSnapshot, usize) = decode_from_slice(&decompressed, standard())
            .map_err(|e| IndexError::Snapshot(e.to_string()))?;

        if snapshot.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::UnsupportedSchema(snapshot.schema_version));
        }
        if let Some(bad) = snapshot
            .entries
            .iter()
            .find(|e| e.vector.len() != snapshot.dimension)
        {
            return Err(IndexError::DimensionMismatch {
                expected: snapshot.dimension,
                got: bad.vector.len(),
            });
        }
        Ok(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IndexError> {
        let bytes = self.encode(DEFAULT_COMPRESSION_LEVEL)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }
}

impl AnnIndex {
    /// Load a snapshot file and rebuild the index.
    pub fn open<P: AsRef<Path>>(path: P, config: AnnConfig) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let snapshot = IndexSnapshot::load(path)?;
        tracing::info!(
            path = %path.display(),
            vectors = snapshot.len(),
            dimension = snapshot.dimension(),
            "loaded index snapshot"
        );
        snapshot.into_index(config)
    }

    /// Write the index's vectors to a snapshot file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IndexError> {
        IndexSnapshot::from_index(self).save(path)
    }
}
