//! JSON shapes exchanged with the inference server.
//!
//! Requests carry the model identity plus either `inputs` (texts) or
//! `images` (base64 payloads). Responses are accepted in the common
//! shapes: `{"embeddings": [[..]]}`, `{"data": [{"embedding": [..]}]}`,
//! `{"embedding": [..]}` or a bare array.

use serde_json::{json, Value};

use crate::{EncoderConfig, SemanticError};

pub(crate) fn text_payload(cfg: &EncoderConfig, text: &str) -> Value {
    json!({
        "model": cfg.model_key,
        "family": cfg.kind.as_str(),
        "pretrained": cfg.resolved_pretrained(),
        "inputs": [text],
    })
}

pub(crate) fn image_payload(cfg: &EncoderConfig, encoded_image: &str) -> Value {
    json!({
        "model": cfg.model_key,
        "family": cfg.kind.as_str(),
        "pretrained": cfg.resolved_pretrained(),
        "images": [encoded_image],
    })
}

/// First vector of a response body.
pub(crate) fn first_embedding(value: Value) -> Result<Vec<f32>, SemanticError> {
    parse_embeddings(value)?
        .into_iter()
        .next()
        .ok_or_else(|| SemanticError::Inference("response contained no embeddings".into()))
}

pub(crate) fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_collection(embeddings);
            }
            if let Some(embedding) = map.remove("embedding") {
                return parse_vector(embedding).map(|v| vec![v]);
            }
            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                SemanticError::Inference(
                                    "missing `embedding` field in data item".into(),
                                )
                            })
                            .and_then(parse_vector),
                        _ => Err(SemanticError::Inference(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect();
            }
            Err(SemanticError::Inference(
                "unsupported inference response shape".into(),
            ))
        }
        other => parse_collection(other),
    }
}

fn parse_collection(value: Value) -> Result<Vec<Vec<f32>>, SemanticError> {
    match value {
        Value::Array(items) if items.iter().all(|item| matches!(item, Value::Array(_))) => {
            items.into_iter().map(parse_vector).collect()
        }
        other => parse_vector(other).map(|v| vec![v]),
    }
}

fn parse_vector(value: Value) -> Result<Vec<f32>, SemanticError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| SemanticError::Inference("non-finite embedding value".into())),
                other => Err(SemanticError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(SemanticError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}
