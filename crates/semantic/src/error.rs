use thiserror::Error;

/// Errors surfaced by encoders and translators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    /// Configuration is inconsistent (e.g., HTTP transport without endpoint).
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
    /// Blank text or an empty image payload.
    #[error("nothing to encode: {0}")]
    EmptyInput(String),
    /// The backend cannot embed this kind of input (e.g., images on a sentence encoder).
    #[error("{backend} cannot encode {modality} input")]
    UnsupportedModality {
        backend: String,
        modality: &'static str,
    },
    /// Network or protocol failure talking to an inference/translation service.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The model ran but returned no usable vector.
    #[error("inference failure: {0}")]
    Inference(String),
    /// The model returned a vector of the wrong size.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    /// Language detection or translation failed.
    #[error("translation failure: {0}")]
    Translation(String),
}
