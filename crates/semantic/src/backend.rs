use crate::config::{EncoderConfig, EncoderKind, TransportKind};
use crate::hashed::HashedTransport;
#[cfg(feature = "http")]
use crate::http::HttpTransport;
use crate::normalize::{is_usable, l2_normalize_in_place};
use crate::{EncodeInput, Encoder, SemanticError};

/// CLIP's text tower sees at most 77 tokens; long prompts are cut by words
/// before they reach the server.
pub const CLIP_MAX_WORDS: usize = 75;

#[derive(Debug, Clone)]
enum Transport {
    #[cfg(feature = "http")]
    Http(HttpTransport),
    Hashed(HashedTransport),
}

impl Transport {
    fn from_config(cfg: &EncoderConfig) -> Result<Self, SemanticError> {
        match cfg.transport {
            TransportKind::Hashed => Ok(Transport::Hashed(HashedTransport::new(
                &cfg.model_key,
                cfg.dimension,
            ))),
            #[cfg(feature = "http")]
            TransportKind::Http => Ok(Transport::Http(HttpTransport::new(cfg)?)),
            #[cfg(not(feature = "http"))]
            TransportKind::Http => Err(SemanticError::InvalidConfig(
                "http transport requires the `http` feature".into(),
            )),
        }
    }

    fn embed(&self, input: &EncodeInput<'_>) -> Result<Vec<f32>, SemanticError> {
        match self {
            #[cfg(feature = "http")]
            Transport::Http(http) => http.embed(input),
            Transport::Hashed(hashed) => Ok(hashed.embed(input)),
        }
    }
}

/// Checks dimensionality, rejects degenerate vectors and L2-normalizes.
fn finish(mut vector: Vec<f32>, expected: usize) -> Result<Vec<f32>, SemanticError> {
    if vector.len() != expected {
        return Err(SemanticError::DimensionMismatch {
            expected,
            got: vector.len(),
        });
    }
    if !is_usable(&vector) {
        return Err(SemanticError::Inference(
            "encoder returned a zero or non-finite vector".into(),
        ));
    }
    l2_normalize_in_place(&mut vector);
    Ok(vector)
}

fn non_blank(text: &str) -> Result<&str, SemanticError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SemanticError::EmptyInput("query text is blank".into()));
    }
    Ok(trimmed)
}

/// Joint text/image encoder of the CLIP family (OpenCLIP or OpenAI weights).
#[derive(Debug, Clone)]
pub struct ClipEncoder {
    cfg: EncoderConfig,
    transport: Transport,
}

impl ClipEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let transport = Transport::from_config(&cfg)?;
        Ok(Self { cfg, transport })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }
}

/// Keeps the first [`CLIP_MAX_WORDS`] words, collapsing whitespace.
pub fn truncate_for_clip(text: &str) -> String {
    text.split_whitespace()
        .take(CLIP_MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Encoder for ClipEncoder {
    fn encode_text(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let prompt = truncate_for_clip(non_blank(text)?);
        let raw = self.transport.embed(&EncodeInput::Text(&prompt))?;
        finish(raw, self.cfg.dimension)
    }

    fn encode_image(&self, image: &[u8]) -> Result<Vec<f32>, SemanticError> {
        if image.is_empty() {
            return Err(SemanticError::EmptyInput("image payload is empty".into()));
        }
        let raw = self.transport.embed(&EncodeInput::Image(image))?;
        finish(raw, self.cfg.dimension)
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    fn name(&self) -> &str {
        &self.cfg.model_key
    }

    fn expected_language(&self) -> &str {
        &self.cfg.expected_language
    }
}

/// Text-only sentence encoder.
#[derive(Debug, Clone)]
pub struct SentenceEncoder {
    cfg: EncoderConfig,
    transport: Transport,
}

impl SentenceEncoder {
    pub fn new(cfg: EncoderConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let transport = Transport::from_config(&cfg)?;
        Ok(Self { cfg, transport })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }
}

impl Encoder for SentenceEncoder {
    fn encode_text(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let raw = self.transport.embed(&EncodeInput::Text(non_blank(text)?))?;
        finish(raw, self.cfg.dimension)
    }

    fn encode_image(&self, _image: &[u8]) -> Result<Vec<f32>, SemanticError> {
        Err(SemanticError::UnsupportedModality {
            backend: self.cfg.kind.as_str().to_string(),
            modality: "image",
        })
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    fn name(&self) -> &str {
        &self.cfg.model_key
    }

    fn expected_language(&self) -> &str {
        &self.cfg.expected_language
    }
}

/// The closed set of encoder backends, chosen once from configuration.
#[derive(Debug, Clone)]
pub enum EncoderBackend {
    OpenClip(ClipEncoder),
    OpenAiClip(ClipEncoder),
    SentenceTransformer(SentenceEncoder),
}

impl EncoderBackend {
    pub fn from_config(cfg: EncoderConfig) -> Result<Self, SemanticError> {
        let backend = match cfg.kind {
            EncoderKind::OpenClip => EncoderBackend::OpenClip(ClipEncoder::new(cfg)?),
            EncoderKind::OpenAiClip => EncoderBackend::OpenAiClip(ClipEncoder::new(cfg)?),
            EncoderKind::SentenceTransformer => {
                EncoderBackend::SentenceTransformer(SentenceEncoder::new(cfg)?)
            }
        };
        tracing::debug!(
            kind = backend.kind().as_str(),
            model = backend.name(),
            dimension = backend.dimension(),
            "encoder backend ready"
        );
        Ok(backend)
    }

    pub fn kind(&self) -> EncoderKind {
        match self {
            EncoderBackend::OpenClip(_) => EncoderKind::OpenClip,
            EncoderBackend::OpenAiClip(_) => EncoderKind::OpenAiClip,
            EncoderBackend::SentenceTransformer(_) => EncoderKind::SentenceTransformer,
        }
    }

    fn inner(&self) -> &dyn Encoder {
        match self {
            EncoderBackend::OpenClip(enc) | EncoderBackend::OpenAiClip(enc) => enc,
            EncoderBackend::SentenceTransformer(enc) => enc,
        }
    }
}

impl Encoder for EncoderBackend {
    fn encode_text(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        self.inner().encode_text(text)
    }

    fn encode_image(&self, image: &[u8]) -> Result<Vec<f32>, SemanticError> {
        self.inner().encode_image(image)
    }

    fn dimension(&self) -> usize {
        self.inner().dimension()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn expected_language(&self) -> &str {
        self.inner().expected_language()
    }
}
