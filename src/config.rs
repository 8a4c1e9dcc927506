//! YAML configuration for a VKIS deployment.
//!
//! One document describes every searchable model (encoder + index files),
//! the fusion ranking weights, the optional query translator and logging.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! fusion_model: 6
//!
//! models:
//!   6:
//!     name: "ViT-L/14"
//!     encoder:
//!       kind: open_clip
//!       model_key: "ViT-L-14-336"
//!       pretrained: "openai"
//!       dimension: 768
//!       transport: http
//!       endpoint: "http://localhost:8001"
//!     index:
//!       bin_path: "data/bin/l14.bin"
//!       json_path: "data/index/path_index_clip.json"
//!       metric: inner_product
//!
//! fusion:
//!   coverage_weight: 1000.0
//!   similarity_weight: 100.0
//!   evidence_weight: 1.0
//!
//! translator:
//!   endpoint: "http://localhost:5000"
//!   target_language: "en"
//!
//! logging:
//!   level: "info"
//!   json: false
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use matcher::{FusionConfig, ModelSpec};
use semantic::TranslatorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_LOG_LEVEL: &str = "VKIS_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "VKIS_LOG_JSON";
pub const ENV_FUSION_MODEL: &str = "VKIS_FUSION_MODEL";

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VkisConfig {
    /// Configuration format version
    pub version: String,

    /// Model used for multi-context search. Falls back to the first loaded
    /// model when unset.
    #[serde(default)]
    pub fusion_model: Option<u32>,

    /// Searchable models keyed by their public id.
    #[serde(default)]
    pub models: BTreeMap<u32, ModelSpec>,

    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub translator: Option<TranslatorConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl VkisConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: VkisConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        for (id, model) in &self.models {
            if model.name.trim().is_empty() {
                return Err(ConfigLoadError::Validation(format!(
                    "models.{id}.name must not be empty"
                )));
            }
            model
                .encoder
                .validate()
                .map_err(|e| ConfigLoadError::Validation(format!("models.{id}.encoder: {e}")))?;
        }

        if let Some(id) = self.fusion_model {
            if !self.models.contains_key(&id) {
                return Err(ConfigLoadError::Validation(format!(
                    "fusion_model {id} is not a configured model"
                )));
            }
        }

        self.fusion
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("fusion: {e}")))?;

        if let Some(translator) = &self.translator {
            translator
                .validate()
                .map_err(|e| ConfigLoadError::Validation(format!("translator: {e}")))?;
        }

        self.logging.validate()
    }

    /// Apply `VKIS_*` overrides from `vars`, then re-validate.
    ///
    /// Takes the variables as a map so callers decide where they come from
    /// (`std::env::vars().collect()` in a binary, a literal map in tests).
    pub fn apply_env_overrides(
        &mut self,
        vars: &BTreeMap<String, String>,
    ) -> Result<(), ConfigLoadError> {
        if let Some(level) = vars.get(ENV_LOG_LEVEL) {
            self.logging.level = level.clone();
        }
        if let Some(json) = vars.get(ENV_LOG_JSON) {
            self.logging.json = parse_flag(json).ok_or_else(|| {
                ConfigLoadError::Validation(format!("{ENV_LOG_JSON}: expected a boolean, got {json:?}"))
            })?;
        }
        if let Some(model) = vars.get(ENV_FUSION_MODEL) {
            let id = model.trim().parse::<u32>().map_err(|_| {
                ConfigLoadError::Validation(format!("{ENV_FUSION_MODEL}: expected a model id, got {model:?}"))
            })?;
            self.fusion_model = Some(id);
        }
        self.validate()
    }

    /// Enabled models in id order.
    pub fn enabled_models(&self) -> impl Iterator<Item = (u32, &ModelSpec)> + '_ {
        self.models
            .iter()
            .filter(|(_, spec)| spec.enabled)
            .map(|(id, spec)| (*id, spec))
    }
}

impl Default for VkisConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            fusion_model: None,
            models: BTreeMap::new(),
            fusion: FusionConfig::default(),
            translator: None,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `"info"` or `"warn,matcher=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::Metric;
    use semantic::{EncoderKind, TransportKind};

    const FULL: &str = r#"
version: "1.0"
fusion_model: 6
models:
  6:
    name: "ViT-L/14"
    encoder:
      kind: open_clip
      model_key: "ViT-L-14-336"
      pretrained: "openai"
      dimension: 768
      transport: http
      endpoint: "http://localhost:8001"
    index:
      bin_path: "data/bin/l14.bin"
      json_path: "data/index/path_index_clip.json"
      metric: cosine
  9:
    name: "mpnet"
    enabled: false
    encoder:
      kind: sentence_transformer
      model_key: "all-mpnet-base-v2"
      dimension: 768
      transport: hashed
    index:
      bin_path: "data/bin/mpnet.bin"
      json_path: "data/index/path_index_mpnet.json"
fusion:
  coverage_weight: 500.0
  similarity_weight: 100.0
translator:
  endpoint: "http://localhost:5000"
logging:
  level: "debug"
  json: true
"#;

    #[test]
    fn full_document_parses() {
        let cfg = VkisConfig::from_yaml(FULL).unwrap();
        assert_eq!(cfg.fusion_model, Some(6));
        assert_eq!(cfg.models.len(), 2);

        let clip = &cfg.models[&6];
        assert!(clip.enabled);
        assert_eq!(clip.encoder.kind, EncoderKind::OpenClip);
        assert_eq!(clip.encoder.expected_language, "en");
        assert_eq!(clip.index.metric, Metric::Cosine);

        let mpnet = &cfg.models[&9];
        assert!(!mpnet.enabled);
        assert_eq!(mpnet.encoder.transport, TransportKind::Hashed);
        assert_eq!(mpnet.index.metric, Metric::InnerProduct);

        assert_eq!(cfg.fusion.coverage_weight, 500.0);
        assert_eq!(cfg.fusion.evidence_weight, 1.0);
        assert_eq!(cfg.fusion.frames_per_video, 10);
        assert_eq!(cfg.translator.as_ref().unwrap().target_language, "en");
        assert!(cfg.logging.json);

        let enabled: Vec<u32> = cfg.enabled_models().map(|(id, _)| id).collect();
        assert_eq!(enabled, vec![6]);
    }

    #[test]
    fn minimal_document_uses_defaults() {
        let cfg = VkisConfig::from_yaml("version: \"1\"\n").unwrap();
        assert!(cfg.models.is_empty());
        assert_eq!(cfg.fusion, FusionConfig::default());
        assert_eq!(cfg.logging, LoggingConfig::default());
        assert!(cfg.translator.is_none());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = VkisConfig::from_yaml("version: \"2.0\"\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
    }

    #[test]
    fn unknown_fusion_model_is_rejected() {
        let yaml = FULL.replace("fusion_model: 6", "fusion_model: 7");
        let err = VkisConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.contains("fusion_model 7")));
    }

    #[test]
    fn http_encoder_without_endpoint_is_rejected() {
        let yaml = FULL.replace("      endpoint: \"http://localhost:8001\"\n", "");
        let err = VkisConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.starts_with("models.6.encoder")));
    }

    #[test]
    fn weights_breaking_the_tiers_are_rejected() {
        let yaml = FULL.replace("coverage_weight: 500.0", "coverage_weight: 150.0");
        let err = VkisConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.starts_with("fusion")));
    }

    #[test]
    fn empty_model_name_is_rejected() {
        let yaml = FULL.replace("name: \"mpnet\"", "name: \"  \"");
        let err = VkisConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Validation(msg) if msg.contains("models.9.name")));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = VkisConfig::from_yaml("version: [1.0\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::YamlParse(_)));
    }

    #[test]
    fn env_overrides_apply_and_revalidate() {
        let mut cfg = VkisConfig::from_yaml(FULL).unwrap();
        let vars = BTreeMap::from([
            (ENV_LOG_LEVEL.to_string(), "warn".to_string()),
            (ENV_LOG_JSON.to_string(), "off".to_string()),
            (ENV_FUSION_MODEL.to_string(), "9".to_string()),
        ]);
        cfg.apply_env_overrides(&vars).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert!(!cfg.logging.json);
        assert_eq!(cfg.fusion_model, Some(9));

        let bad = BTreeMap::from([(ENV_FUSION_MODEL.to_string(), "42".to_string())]);
        assert!(matches!(
            cfg.apply_env_overrides(&bad),
            Err(ConfigLoadError::Validation(_))
        ));

        let garbage = BTreeMap::from([(ENV_LOG_JSON.to_string(), "maybe".to_string())]);
        assert!(cfg.apply_env_overrides(&garbage).is_err());
    }
}
