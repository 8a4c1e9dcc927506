use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::SemanticError;

/// Which family of encoder a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    /// OpenCLIP checkpoints (`ViT-B-32`, `hf-hub:...`).
    OpenClip,
    /// OpenAI's released CLIP weights (`ViT-B/32`, `ViT-L/14@336px`).
    OpenAiClip,
    /// Text-only sentence encoder; images are rejected.
    SentenceTransformer,
}

impl EncoderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncoderKind::OpenClip => "open_clip",
            EncoderKind::OpenAiClip => "openai_clip",
            EncoderKind::SentenceTransformer => "sentence_transformer",
        }
    }

    pub fn supports_images(&self) -> bool {
        !matches!(self, EncoderKind::SentenceTransformer)
    }
}

/// How vectors are actually produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// POST to a remote inference server.
    #[default]
    Http,
    /// Deterministic hash-derived vectors; no model involved.
    Hashed,
}

/// Settings for one query encoder.
///
/// # Example
/// ```
/// use semantic::{EncoderConfig, EncoderKind, TransportKind};
///
/// let cfg = EncoderConfig::new(EncoderKind::OpenClip, "ViT-B-32", 512)
///     .with_transport(TransportKind::Hashed);
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.resolved_pretrained().as_deref(), Some("laion2b_s34b_b79k"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub kind: EncoderKind,
    /// Model identifier understood by the inference server.
    pub model_key: String,
    /// Pretrained tag for OpenCLIP. Derived from `model_key` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretrained: Option<String>,
    /// Embedding dimensionality; must match the index.
    pub dimension: usize,
    #[serde(default)]
    pub transport: TransportKind,
    /// Base URL of the inference server (required for `http`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Language the model was trained on; queries in other languages get translated.
    #[serde(default = "EncoderConfig::default_expected_language")]
    pub expected_language: String,
    #[serde(default = "EncoderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl EncoderConfig {
    fn default_expected_language() -> String {
        "en".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    pub fn new(kind: EncoderKind, model_key: impl Into<String>, dimension: usize) -> Self {
        Self {
            kind,
            model_key: model_key.into(),
            pretrained: None,
            dimension,
            transport: TransportKind::default(),
            endpoint: None,
            expected_language: Self::default_expected_language(),
            timeout_secs: Self::default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_pretrained(mut self, pretrained: impl Into<String>) -> Self {
        self.pretrained = Some(pretrained.into());
        self
    }

    pub fn with_expected_language(mut self, language: impl Into<String>) -> Self {
        self.expected_language = language.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Pretrained tag sent to the server.
    ///
    /// Hub checkpoints carry their own weights, QuickGELU models default to
    /// `dfn5b`, other OpenCLIP models to `laion2b_s34b_b79k`. OpenAI CLIP
    /// always uses `openai`; sentence encoders have none.
    pub fn resolved_pretrained(&self) -> Option<String> {
        if let Some(explicit) = &self.pretrained {
            return Some(explicit.clone());
        }
        match self.kind {
            EncoderKind::OpenClip => {
                if self.model_key.starts_with("hf-hub:") {
                    None
                } else if self.model_key.to_lowercase().contains("quickgelu") {
                    Some("dfn5b".to_string())
                } else {
                    Some("laion2b_s34b_b79k".to_string())
                }
            }
            EncoderKind::OpenAiClip => Some("openai".to_string()),
            EncoderKind::SentenceTransformer => None,
        }
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.model_key.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "model_key must not be empty".into(),
            ));
        }
        if self.dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "dimension must be greater than 0".into(),
            ));
        }
        if self.transport == TransportKind::Http
            && self
                .endpoint
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .is_empty()
        {
            return Err(SemanticError::InvalidConfig(format!(
                "model {} uses http transport but has no endpoint",
                self.model_key
            )));
        }
        if self.expected_language.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "expected_language must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Settings for the HTTP translation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub endpoint: String,
    #[serde(default = "EncoderConfig::default_expected_language")]
    pub target_language: String,
    #[serde(default = "EncoderConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl TranslatorConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            target_language: EncoderConfig::default_expected_language(),
            timeout_secs: EncoderConfig::default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.endpoint.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "translator endpoint must not be empty".into(),
            ));
        }
        if self.target_language.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "translator target_language must not be empty".into(),
            ));
        }
        Ok(())
    }
}
