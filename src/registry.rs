//! Explicit model table: one search service per loaded model.

use std::collections::BTreeMap;
use std::sync::Arc;

use matcher::{EmbeddingSearchService, FusionConfig, FusionError, MultiContextSearch};
#[cfg(feature = "http")]
use semantic::HttpTranslator;
use semantic::Translator;
use thiserror::Error;

use crate::config::VkisConfig;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model {0} is not loaded")]
    ModelNotLoaded(u32),
    #[error("no model is loaded")]
    Empty,
    #[error(transparent)]
    Fusion(#[from] FusionError),
}

/// Whether a configured model made it into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStatus {
    pub id: u32,
    pub name: String,
    pub loaded: bool,
}

/// Search services keyed by model id.
///
/// Built once at startup and handed to whatever serves requests; a model
/// that fails to load is left out and reported by [`ServiceRegistry::status`].
#[derive(Clone)]
pub struct ServiceRegistry {
    services: BTreeMap<u32, Arc<EmbeddingSearchService>>,
    status: Vec<ModelStatus>,
    fusion_model: Option<u32>,
    fusion: FusionConfig,
}

impl ServiceRegistry {
    /// Open every enabled model in `config`. Never fails: models whose files
    /// or encoders cannot be loaded are skipped with a warning.
    pub fn load(config: &VkisConfig) -> Self {
        let translator = build_translator(config);
        let mut registry = Self::empty(config);

        for (id, spec) in &config.models {
            if !spec.enabled {
                tracing::debug!(model = *id, name = %spec.name, "model disabled, skipped");
                registry.push_status(*id, &spec.name, false);
                continue;
            }
            match EmbeddingSearchService::open(spec) {
                Ok(service) => {
                    let service = match &translator {
                        Some(t) => service.with_translator(Arc::clone(t)),
                        None => service,
                    };
                    registry.services.insert(*id, Arc::new(service));
                    registry.push_status(*id, &spec.name, true);
                }
                Err(err) => {
                    tracing::warn!(
                        model = *id,
                        name = %spec.name,
                        error = %err,
                        "failed to load model, skipping"
                    );
                    registry.push_status(*id, &spec.name, false);
                }
            }
        }

        tracing::info!(
            loaded = registry.services.len(),
            configured = config.models.len(),
            "service registry ready"
        );
        registry
    }

    /// Registry with no models, using `config`'s fusion settings.
    pub fn empty(config: &VkisConfig) -> Self {
        Self {
            services: BTreeMap::new(),
            status: Vec::new(),
            fusion_model: config.fusion_model,
            fusion: config.fusion,
        }
    }

    /// Register an already-built service, replacing any previous one.
    pub fn insert(&mut self, id: u32, name: impl Into<String>, service: EmbeddingSearchService) {
        let name = name.into();
        self.status.retain(|s| s.id != id);
        self.push_status(id, &name, true);
        self.services.insert(id, Arc::new(service));
    }

    pub fn get(&self, id: u32) -> Option<Arc<EmbeddingSearchService>> {
        self.services.get(&id).cloned()
    }

    /// Loaded model ids, ascending.
    pub fn ids(&self) -> Vec<u32> {
        self.services.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Every configured model and whether it loaded, in id order.
    pub fn status(&self) -> &[ModelStatus] {
        &self.status
    }

    /// Multi-context search over the configured fusion model, or the first
    /// loaded model when that one is unavailable.
    pub fn multi_context(&self) -> Result<MultiContextSearch, RegistryError> {
        let (id, service) = match self.fusion_model.and_then(|id| self.services.get_key_value(&id)) {
            Some((id, service)) => (*id, service),
            None => {
                let (id, service) = self.services.iter().next().ok_or(RegistryError::Empty)?;
                if let Some(wanted) = self.fusion_model {
                    tracing::warn!(
                        wanted,
                        using = *id,
                        "fusion model not loaded, falling back"
                    );
                }
                (*id, service)
            }
        };
        tracing::debug!(model = id, "multi-context search bound");
        Ok(MultiContextSearch::new(service.clone(), self.fusion)?)
    }

    /// Multi-context search bound to a specific model.
    pub fn multi_context_for(&self, id: u32) -> Result<MultiContextSearch, RegistryError> {
        let service = self
            .services
            .get(&id)
            .ok_or(RegistryError::ModelNotLoaded(id))?;
        Ok(MultiContextSearch::new(service.clone(), self.fusion)?)
    }

    fn push_status(&mut self, id: u32, name: &str, loaded: bool) {
        let at = self.status.partition_point(|s| s.id < id);
        self.status.insert(
            at,
            ModelStatus {
                id,
                name: name.to_string(),
                loaded,
            },
        );
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("models", &self.ids())
            .field("fusion_model", &self.fusion_model)
            .finish()
    }
}

#[cfg(feature = "http")]
fn build_translator(config: &VkisConfig) -> Option<Arc<dyn Translator>> {
    let cfg = config.translator.clone()?;
    match HttpTranslator::new(cfg) {
        Ok(translator) => Some(Arc::new(translator)),
        Err(err) => {
            tracing::warn!(error = %err, "translator unavailable, queries will not be translated");
            None
        }
    }
}

#[cfg(not(feature = "http"))]
fn build_translator(config: &VkisConfig) -> Option<Arc<dyn Translator>> {
    if config.translator.is_some() {
        tracing::warn!("translator configured but the `http` feature is disabled");
    }
    None
}
