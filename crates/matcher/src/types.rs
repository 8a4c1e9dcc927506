use std::collections::BTreeMap;
use std::path::PathBuf;

use index::{AnnConfig, IndexError, Metric};
use semantic::{EncoderConfig, SemanticError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::video_id_of;

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Internal index id.
    pub id: i64,
    /// Leading path segment; empty when the path has none.
    pub video_id: String,
    /// Similarity to the query (higher = closer).
    pub score: f32,
    /// Keyframe storage path, verbatim from the id map.
    pub path: String,
}

impl Item {
    pub fn new(id: i64, path: impl Into<String>, score: f32) -> Self {
        let path = path.into();
        Self {
            id,
            video_id: video_id_of(&path).unwrap_or_default().to_string(),
            score,
            path,
        }
    }
}

/// Hits for one context, best first.
pub type ContextResultSet = Vec<Item>;

/// Cross-context annotation attached to every fused frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionMetadata {
    /// `ranking_score` of the owning video.
    pub multi_context_score: f64,
    /// Number of contexts the owning video matched.
    pub contexts_matched: usize,
    /// Context slots the owning video matched, ascending.
    pub matched_contexts: Vec<usize>,
    /// `contexts_matched / total_contexts`, in `(0, 1]`.
    pub coverage: f64,
}

/// A frame as returned to callers.
///
/// `fusion` is `None` on the single-context path, where results are passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedFrame {
    #[serde(flatten)]
    pub item: Item,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub fusion: Option<FusionMetadata>,
}

impl FusedFrame {
    pub fn plain(item: Item) -> Self {
        Self { item, fusion: None }
    }

    pub fn is_multi_context(&self) -> bool {
        self.fusion.is_some()
    }

    pub fn contexts_matched(&self) -> usize {
        self.fusion.as_ref().map_or(0, |f| f.contexts_matched)
    }
}

/// One candidate video after fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVideo {
    pub video_id: String,
    pub ranking_score: f64,
    pub num_contexts_matched: usize,
    pub total_contexts: usize,
    pub coverage: f64,
    pub avg_score: f64,
    pub max_score: f32,
    /// Matched items across all contexts (before truncation).
    pub num_frames: usize,
    /// Highest-scoring frames, at most `frames_per_video`.
    pub top_frames: Vec<Item>,
    /// Context slots matched, ascending.
    pub matched_contexts: Vec<usize>,
    /// Best item per matched context.
    pub context_best_frames: BTreeMap<usize, Item>,
}

/// Result of [`FusionEngine::rank_videos`](crate::FusionEngine::rank_videos).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FusionOutcome {
    pub videos: Vec<RankedVideo>,
    /// Threshold the returned videos satisfy.
    pub min_contexts_applied: usize,
    /// True when nothing met the requested threshold and it was lowered to 1.
    pub relaxed: bool,
}

/// Per-video card built from a fused frame list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    /// Read from the first frame's fusion metadata; 0 without metadata.
    pub contexts_matched: usize,
    pub total_frames: usize,
    pub avg_score: f64,
    pub best_frame: FusedFrame,
    /// First frames of the video, in input order.
    pub sample_frames: Vec<FusedFrame>,
}

/// Fusion ranking knobs.
///
/// The three weights implement a tiered priority: one extra matched context
/// must always outweigh any difference in average similarity, which in turn
/// outweighs frame count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "FusionConfig::default_coverage_weight")]
    pub coverage_weight: f64,
    #[serde(default = "FusionConfig::default_similarity_weight")]
    pub similarity_weight: f64,
    #[serde(default = "FusionConfig::default_evidence_weight")]
    pub evidence_weight: f64,
    /// Cap for the default `min_contexts` (`min(cap, contexts)`).
    #[serde(default = "FusionConfig::default_max_default_min_contexts")]
    pub max_default_min_contexts: usize,
    #[serde(default = "FusionConfig::default_frames_per_video")]
    pub frames_per_video: usize,
    #[serde(default = "FusionConfig::default_sample_frames")]
    pub sample_frames: usize,
    /// Run per-context searches on the rayon pool.
    #[serde(default = "FusionConfig::default_parallel_contexts")]
    pub parallel_contexts: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            coverage_weight: Self::default_coverage_weight(),
            similarity_weight: Self::default_similarity_weight(),
            evidence_weight: Self::default_evidence_weight(),
            max_default_min_contexts: Self::default_max_default_min_contexts(),
            frames_per_video: Self::default_frames_per_video(),
            sample_frames: Self::default_sample_frames(),
            parallel_contexts: Self::default_parallel_contexts(),
        }
    }
}

impl FusionConfig {
    fn default_coverage_weight() -> f64 {
        1000.0
    }

    fn default_similarity_weight() -> f64 {
        100.0
    }

    fn default_evidence_weight() -> f64 {
        1.0
    }

    fn default_max_default_min_contexts() -> usize {
        2
    }

    fn default_frames_per_video() -> usize {
        10
    }

    fn default_sample_frames() -> usize {
        5
    }

    fn default_parallel_contexts() -> bool {
        true
    }

    pub fn with_parallel_contexts(mut self, parallel: bool) -> Self {
        self.parallel_contexts = parallel;
        self
    }

    pub fn with_frames_per_video(mut self, frames: usize) -> Self {
        self.frames_per_video = frames;
        self
    }

    /// Whether `search_k` hits per context give the frame-count term enough
    /// room to reach the next coverage tier.
    pub fn evidence_can_cross_tiers(&self, search_k: usize) -> bool {
        search_k as f64 * self.evidence_weight
            >= self.coverage_weight - 2.0 * self.similarity_weight
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        for (name, weight) in [
            ("coverage_weight", self.coverage_weight),
            ("similarity_weight", self.similarity_weight),
            ("evidence_weight", self.evidence_weight),
        ] {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(FusionError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {weight}"
                )));
            }
        }
        // similarity spans [-1, 1] * similarity_weight
        if self.coverage_weight <= 2.0 * self.similarity_weight {
            return Err(FusionError::InvalidConfig(format!(
                "coverage_weight ({}) must exceed twice similarity_weight ({})",
                self.coverage_weight, self.similarity_weight
            )));
        }
        if self.max_default_min_contexts == 0 {
            return Err(FusionError::InvalidConfig(
                "max_default_min_contexts must be at least 1".into(),
            ));
        }
        if self.frames_per_video == 0 {
            return Err(FusionError::InvalidConfig(
                "frames_per_video must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where a model's index snapshot and id map live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub bin_path: PathBuf,
    pub json_path: PathBuf,
    #[serde(default)]
    pub metric: Metric,
    #[serde(default)]
    pub ann: AnnConfig,
}

/// One searchable model: an encoder plus the index built with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    #[serde(default = "ModelSpec::default_enabled")]
    pub enabled: bool,
    pub encoder: EncoderConfig,
    pub index: IndexSpec,
}

impl ModelSpec {
    fn default_enabled() -> bool {
        true
    }
}

/// Errors from the embedding search service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// Index or id map missing, unreadable or incompatible with the encoder.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("failed to encode query: {0}")]
    EncodeFailure(#[from] SemanticError),
    #[error("id {0} is not in the index")]
    UnknownId(i64),
    #[error("index error: {0}")]
    Index(IndexError),
}

impl From<IndexError> for SearchError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::UnknownId(id) => SearchError::UnknownId(id),
            other => SearchError::Index(other),
        }
    }
}

/// Errors from fusion setup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    #[error("invalid fusion config: {0}")]
    InvalidConfig(String),
}
