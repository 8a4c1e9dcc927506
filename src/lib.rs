//! Workspace umbrella crate for VKIS (video known-item search).
//!
//! Ties the workspace crates together for a deployment: load a
//! [`VkisConfig`], install logging with [`telemetry::init_tracing`], open every
//! model into a [`ServiceRegistry`] and serve single-model or multi-context
//! keyframe queries from it.
//!
//! ```no_run
//! use vkis::{ServiceRegistry, VkisConfig, telemetry};
//!
//! let config = VkisConfig::from_file("vkis.yaml")?;
//! telemetry::init_tracing(&config.logging)?;
//!
//! let registry = ServiceRegistry::load(&config);
//! let search = registry.multi_context()?;
//! let frames = search.search_multi_context(&["a red car", "a man with glasses"], 10, 100, None);
//! for card in search.get_video_summary(&frames) {
//!     println!("{} matched {} contexts", card.video_id, card.contexts_matched);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod registry;
pub mod telemetry;

pub use crate::config::{ConfigLoadError, LoggingConfig, VkisConfig};
pub use crate::registry::{ModelStatus, RegistryError, ServiceRegistry};

pub use index::{AnnConfig, AnnIndex, IdPathMap, IndexError, IndexSnapshot, Metric, VectorIndex};
pub use matcher::{
    ContextResolver, ContextResultSet, EmbeddingSearchService, FusedFrame, FusionConfig,
    FusionEngine, FusionError, FusionMetadata, FusionMetrics, FusionOutcome, IndexSpec, Item,
    ModelSpec, MultiContextSearch, RankedVideo, SearchError, TextSearcher, VideoSummary,
    summarize, video_id_of,
};
pub use semantic::{
    Encoder, EncoderBackend, EncoderConfig, EncoderKind, SemanticError, TransportKind, Translator,
    TranslatorConfig,
};
