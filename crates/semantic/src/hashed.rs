use fxhash::hash64;

use crate::EncodeInput;

/// Deterministic transport used in tests and offline demos.
///
/// Each component is derived from a hash of the model key, the input
/// modality and the content, so identical inputs always map to identical
/// vectors and a text never collides with an image of the same bytes.
#[derive(Debug, Clone)]
pub(crate) struct HashedTransport {
    model_key: String,
    dimension: usize,
}

impl HashedTransport {
    pub(crate) fn new(model_key: &str, dimension: usize) -> Self {
        Self {
            model_key: model_key.to_string(),
            dimension,
        }
    }

    /// Raw (unnormalized) vector for `input`, components in `[-1, 1]`.
    pub(crate) fn embed(&self, input: &EncodeInput<'_>) -> Vec<f32> {
        let seed = match input {
            EncodeInput::Text(text) => hash64(&(self.model_key.as_str(), "text", text.trim())),
            EncodeInput::Image(bytes) => hash64(&(self.model_key.as_str(), "image", *bytes)),
        };
        (0..self.dimension)
            .map(|idx| {
                let bits = hash64(&(seed, idx as u64));
                ((bits as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
            })
            .collect()
    }
}
