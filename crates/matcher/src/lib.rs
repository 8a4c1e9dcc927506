//! # VKIS Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` answers keyframe queries on top of the vector index (`index`)
//! and the query encoders (`semantic`). It has two layers:
//!
//! - [`EmbeddingSearchService`]: one model's "find the k frames closest to
//!   X", where X is a text, a stored frame id or an uploaded image.
//! - [`MultiContextSearch`]: takes several independent descriptions of one
//!   scene ("a man with glasses", "a red car", ...), searches each, and
//!   ranks *videos* by how many descriptions they satisfy.
//!
//! ## Fusion ranking
//!
//! Hits from every context are grouped by video (the leading segment of
//! the keyframe path, see [`video_id_of`]). A video qualifies when it matched
//! at least `min_contexts` contexts; if none does, the threshold drops to 1
//! so that the best available evidence is still returned. Qualifying videos
//! are ranked by
//!
//! ```text
//! contexts × coverage_weight + avg_score × similarity_weight + frames × evidence_weight
//! ```
//!
//! with defaults 1000 / 100 / 1, a strict tier order: more matched contexts
//! always wins, then higher average similarity, then more frames. The
//! output is the top frames of each retained video, in video rank order,
//! each annotated with [`FusionMetadata`].
//!
//! ## Core Types
//!
//! - [`Item`]: one nearest-neighbor hit (id, video, score, path).
//! - [`FusedFrame`]: an `Item` plus optional fusion metadata.
//! - [`RankedVideo`] / [`FusionOutcome`]: video-level ranking.
//! - [`VideoSummary`]: one display card per video.
//! - [`FusionConfig`]: ranking weights and limits.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use matcher::{FusionConfig, Item, MultiContextSearch, SearchError, TextSearcher};
//!
//! struct Fixed;
//!
//! impl TextSearcher for Fixed {
//!     fn search_text(&self, query: &str, _k: usize) -> Result<Vec<Item>, SearchError> {
//!         Ok(match query {
//!             "red car" => vec![Item::new(1, "L01_V001/0001.jpg", 0.8)],
//!             _ => vec![Item::new(2, "L01_V001/0042.jpg", 0.6)],
//!         })
//!     }
//! }
//!
//! let search = MultiContextSearch::new(Arc::new(Fixed), FusionConfig::default()).unwrap();
//! let frames = search.search_multi_context(&["red car", "tall building"], 10, 100, None);
//! assert_eq!(frames.len(), 2);
//!
//! let cards = search.get_video_summary(&frames);
//! assert_eq!(cards[0].video_id, "L01_V001");
//! assert_eq!(cards[0].contexts_matched, 2);
//! ```
//!
//! ## Observability
//!
//! Pass a [`FusionMetrics`] implementation to
//! [`MultiContextSearch::with_metrics`] to record per-request latency and
//! qualification counts.

pub mod engine;
pub mod metrics;
pub mod resolver;
pub mod search;
pub mod summary;
pub mod types;
mod video;

pub use crate::engine::{FusionEngine, MultiContextSearch};
pub use crate::metrics::FusionMetrics;
pub use crate::resolver::ContextResolver;
pub use crate::search::{EmbeddingSearchService, TextSearcher};
pub use crate::summary::summarize;
pub use crate::types::{
    ContextResultSet, FusedFrame, FusionConfig, FusionError, FusionMetadata, FusionOutcome,
    IndexSpec, Item, ModelSpec, RankedVideo, SearchError, VideoSummary,
};
pub use crate::video::video_id_of;
