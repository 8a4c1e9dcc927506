//! VKIS query encoders
//!
//! This crate turns a user query (a sentence, or an uploaded image) into the
//! unit-normalized vector the keyframe index was built with. Every backend
//! speaks the same [`Encoder`] trait, so the search layer never cares which
//! model is behind it.
//!
//! Backends:
//!
//! - **OpenCLIP** and **OpenAI CLIP** ([`ClipEncoder`]): joint text/image
//!   space. Prompts are cut to [`CLIP_MAX_WORDS`] words before encoding.
//! - **Sentence encoders** ([`SentenceEncoder`]): text only; image queries
//!   fail with [`SemanticError::UnsupportedModality`].
//!
//! Vectors come from a transport picked in [`EncoderConfig`]: `http` calls a
//! remote inference server (feature `http`, on by default), `hashed` derives
//! deterministic vectors from the input and is what tests and offline demos
//! use. Whatever the transport returns is dimension-checked and L2-normalized
//! here.
//!
//! Queries in a language other than the encoder's `expected_language` can be
//! routed through a [`Translator`]; see [`localize_query`].
//!
//! ## Quick example
//!
//! ```
//! use semantic::{Encoder, EncoderBackend, EncoderConfig, EncoderKind, TransportKind};
//!
//! let cfg = EncoderConfig::new(EncoderKind::OpenClip, "ViT-B-32", 512)
//!     .with_transport(TransportKind::Hashed);
//! let encoder = EncoderBackend::from_config(cfg).unwrap();
//!
//! let v = encoder.encode_text("a dog catching a frisbee").unwrap();
//! assert_eq!(v.len(), encoder.dimension());
//! ```

pub mod config;
pub mod error;
pub mod retry;

mod backend;
mod hashed;
#[cfg(feature = "http")]
mod http;
mod normalize;
mod translate;
#[cfg_attr(not(feature = "http"), allow(dead_code))]
mod wire;

pub use crate::backend::{
    truncate_for_clip, ClipEncoder, EncoderBackend, SentenceEncoder, CLIP_MAX_WORDS,
};
pub use crate::config::{EncoderConfig, EncoderKind, TranslatorConfig, TransportKind};
pub use crate::error::SemanticError;
pub use crate::retry::RetryConfig;
#[cfg(feature = "http")]
pub use crate::translate::HttpTranslator;
pub use crate::translate::{localize_query, Translator};

/// One encoder input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeInput<'a> {
    Text(&'a str),
    /// Encoded image file bytes (JPEG/PNG), decoded by the model server.
    Image(&'a [u8]),
}

/// Query encoder capability set.
///
/// Implementations return unit-length vectors of exactly [`dimension`](Self::dimension)
/// components, or an error; never a partial or zero vector.
pub trait Encoder: Send + Sync {
    fn encode_text(&self, text: &str) -> Result<Vec<f32>, SemanticError>;

    fn encode_image(&self, image: &[u8]) -> Result<Vec<f32>, SemanticError>;

    fn dimension(&self) -> usize;

    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Language queries should be in before encoding.
    fn expected_language(&self) -> &str {
        "en"
    }
}
