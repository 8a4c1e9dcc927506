//! On-disk fixtures: a small keyframe collection indexed with the hashed
//! encoder, plus the YAML that points at it.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use vkis::{AnnConfig, AnnIndex, Encoder, EncoderBackend, EncoderConfig, EncoderKind, TransportKind};

pub const DIM: usize = 32;
pub const MODEL_KEY: &str = "ViT-B-32";

/// (path, caption) pairs; each frame's vector is the encoding of its caption.
pub const FRAMES: &[(&str, &str)] = &[
    ("L01_V001/0001.jpg", "a red car on the street"),
    ("L01_V001/0002.jpg", "a tall glass building"),
    ("L01_V001/0003.jpg", "a man with glasses"),
    ("L01_V002/0001.jpg", "a red car on the street at night"),
    ("L01_V002/0002.jpg", "sunset over the sea"),
    ("L02_V001/0001.jpg", "a dog catching a frisbee"),
];

pub fn encoder_config() -> EncoderConfig {
    EncoderConfig::new(EncoderKind::OpenClip, MODEL_KEY, DIM).with_transport(TransportKind::Hashed)
}

/// Write `model.bin` and `paths.json` into `dir`.
pub fn write_collection(dir: &Path) {
    let encoder = EncoderBackend::from_config(encoder_config()).expect("encoder");
    let entries: Vec<(i64, Vec<f32>)> = FRAMES
        .iter()
        .enumerate()
        .map(|(i, (_, caption))| (i as i64, encoder.encode_text(caption).expect("encode")))
        .collect();
    let index = AnnIndex::from_entries(DIM, AnnConfig::default(), entries).expect("index");
    index.save(dir.join("model.bin")).expect("save snapshot");

    let paths: serde_json::Map<String, serde_json::Value> = FRAMES
        .iter()
        .enumerate()
        .map(|(i, (path, _))| (i.to_string(), serde_json::Value::from(*path)))
        .collect();
    fs::write(
        dir.join("paths.json"),
        serde_json::to_string(&paths).expect("json"),
    )
    .expect("write id map");
}

/// Config with model 1 backed by the fixture collection and model 2 pointing
/// at files that do not exist.
pub fn config_yaml(dir: &Path, fusion_model: u32) -> String {
    format!(
        r#"
version: "1.0"
fusion_model: {fusion_model}
models:
  1:
    name: "clip-b32"
    encoder:
      kind: open_clip
      model_key: "{MODEL_KEY}"
      dimension: {DIM}
      transport: hashed
    index:
      bin_path: "{bin}"
      json_path: "{json}"
  2:
    name: "clip-missing"
    encoder:
      kind: open_clip
      model_key: "{MODEL_KEY}"
      dimension: {DIM}
      transport: hashed
    index:
      bin_path: "{missing}"
      json_path: "{json}"
fusion:
  parallel_contexts: false
"#,
        bin = dir.join("model.bin").display(),
        json = dir.join("paths.json").display(),
        missing = dir.join("nope.bin").display(),
    )
}
