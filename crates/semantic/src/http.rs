use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use crate::retry::{execute_with_retry, RetryConfig};
use crate::{wire, EncodeInput, EncoderConfig, SemanticError};

/// Blocking client for a remote embedding server (`POST {endpoint}/embed`).
#[derive(Debug, Clone)]
pub(crate) struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
    cfg: EncoderConfig,
}

impl HttpTransport {
    pub(crate) fn new(cfg: &EncoderConfig) -> Result<Self, SemanticError> {
        let endpoint = cfg
            .endpoint
            .as_deref()
            .ok_or_else(|| SemanticError::InvalidConfig("http transport needs an endpoint".into()))?;
        let client = build_client(cfg.timeout_secs)?;
        Ok(Self {
            client,
            url: format!("{}/embed", endpoint.trim_end_matches('/')),
            cfg: cfg.clone(),
        })
    }

    pub(crate) fn embed(&self, input: &EncodeInput<'_>) -> Result<Vec<f32>, SemanticError> {
        let payload = match input {
            EncodeInput::Text(text) => wire::text_payload(&self.cfg, text),
            EncodeInput::Image(bytes) => wire::image_payload(&self.cfg, &STANDARD.encode(bytes)),
        };
        let body = post_json(&self.client, &self.url, &payload, &self.cfg.retry)?;
        wire::first_embedding(body)
    }
}

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, SemanticError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))
}

/// POST `payload` and parse the JSON reply, retrying transient failures.
pub(crate) fn post_json(
    client: &reqwest::blocking::Client,
    url: &str,
    payload: &Value,
    retry: &RetryConfig,
) -> Result<Value, SemanticError> {
    let outcome = execute_with_retry(retry, |_attempt| {
        let response = client
            .post(url)
            .json(payload)
            .send()
            .map_err(|e| format!("request to {url} failed: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(format!("HTTP {}: {detail}", status.as_u16()));
        }
        response
            .json::<Value>()
            .map_err(|e| format!("invalid JSON from {url}: {e}"))
    });

    if outcome.attempts > 1 {
        tracing::debug!(url, attempts = outcome.attempts, "inference call needed retries");
    }
    outcome.into_result().map_err(SemanticError::Transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncoderKind;

    #[test]
    fn url_drops_trailing_slash() {
        let cfg = EncoderConfig::new(EncoderKind::OpenClip, "ViT-B-32", 512)
            .with_endpoint("http://localhost:8001/");
        let transport = HttpTransport::new(&cfg).unwrap();
        assert_eq!(transport.url, "http://localhost:8001/embed");
    }

    #[test]
    fn missing_endpoint_is_invalid_config() {
        let cfg = EncoderConfig::new(EncoderKind::OpenClip, "ViT-B-32", 512);
        assert!(matches!(
            HttpTransport::new(&cfg),
            Err(SemanticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unreachable_server_is_transport_error() {
        let cfg = EncoderConfig::new(EncoderKind::OpenClip, "ViT-B-32", 4)
            .with_endpoint("http://127.0.0.1:9")
            .with_retry(RetryConfig::disabled());
        let transport = HttpTransport::new(&cfg).unwrap();
        let err = transport.embed(&EncodeInput::Text("cat")).unwrap_err();
        assert!(matches!(err, SemanticError::Transport(_)));
    }
}
