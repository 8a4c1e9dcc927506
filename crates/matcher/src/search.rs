use std::borrow::Cow;
use std::sync::Arc;

use index::{AnnIndex, IdPathMap, VectorIndex};
use semantic::{localize_query, Encoder, EncoderBackend, Translator};

use crate::types::{Item, ModelSpec, SearchError};

/// Anything that can answer a text query with ranked items.
///
/// The context resolver only needs this, which keeps fusion testable
/// without a real index.
pub trait TextSearcher: Send + Sync {
    fn search_text(&self, query: &str, k: usize) -> Result<Vec<Item>, SearchError>;
}

/// Nearest-neighbor search over one model's keyframe index.
///
/// The index and id map are shared read-only; the service itself holds no
/// mutable state, so one instance can serve concurrent requests.
#[derive(Clone)]
pub struct EmbeddingSearchService {
    index: Arc<dyn VectorIndex>,
    id_map: Arc<IdPathMap>,
    encoder: Arc<dyn Encoder>,
    translator: Option<Arc<dyn Translator>>,
}

impl EmbeddingSearchService {
    /// Wire up already-loaded parts. Fails if encoder and index disagree on
    /// dimensionality.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        id_map: Arc<IdPathMap>,
        encoder: Arc<dyn Encoder>,
    ) -> Result<Self, SearchError> {
        if index.dimension() != encoder.dimension() {
            return Err(SearchError::IndexUnavailable(format!(
                "encoder {} produces {}-d vectors but the index holds {}-d vectors",
                encoder.name(),
                encoder.dimension(),
                index.dimension()
            )));
        }
        Ok(Self {
            index,
            id_map,
            encoder,
            translator: None,
        })
    }

    /// Load a model's snapshot and id map from disk and build its encoder.
    pub fn open(spec: &ModelSpec) -> Result<Self, SearchError> {
        let ann = spec.index.ann.with_metric(spec.index.metric);
        let index = AnnIndex::open(&spec.index.bin_path, ann).map_err(|e| {
            SearchError::IndexUnavailable(format!(
                "{}: {e}",
                spec.index.bin_path.display()
            ))
        })?;
        if index.config().metric != spec.index.metric {
            tracing::warn!(
                model = %spec.name,
                configured = ?spec.index.metric,
                stored = ?index.config().metric,
                "snapshot metric differs from configuration; using the snapshot's"
            );
        }

        let id_map = IdPathMap::from_json_file(&spec.index.json_path).map_err(|e| {
            SearchError::IndexUnavailable(format!(
                "{}: {e}",
                spec.index.json_path.display()
            ))
        })?;
        let encoder = EncoderBackend::from_config(spec.encoder.clone())?;

        tracing::info!(
            model = %spec.name,
            vectors = index.len(),
            paths = id_map.len(),
            encoder = encoder.name(),
            "search service loaded"
        );
        Self::new(Arc::new(index), Arc::new(id_map), Arc::new(encoder))
    }

    /// Translate queries whose detected language differs from the encoder's.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Top-`k` items for a text query. Blank queries yield no items.
    pub fn try_text_search(&self, query: &str, k: usize) -> Result<Vec<Item>, SearchError> {
        let query = query.trim();
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let text = match &self.translator {
            Some(translator) => {
                localize_query(translator.as_ref(), query, self.encoder.expected_language())
            }
            None => Cow::Borrowed(query),
        };
        let vector = self.encoder.encode_text(&text)?;
        self.neighbors(&vector, k)
    }

    /// Like [`try_text_search`](Self::try_text_search), but failures are
    /// logged and reported as no results.
    pub fn text_search(&self, query: &str, k: usize) -> Vec<Item> {
        self.try_text_search(query, k)
            .unwrap_or_else(|err| self.swallow("text", err))
    }

    /// Top-`k` items similar to a stored frame, using its stored vector.
    pub fn try_image_search(&self, id: i64, k: usize) -> Result<Vec<Item>, SearchError> {
        let vector = self.index.reconstruct(id)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        self.neighbors(&vector, k)
    }

    pub fn image_search(&self, id: i64, k: usize) -> Vec<Item> {
        self.try_image_search(id, k)
            .unwrap_or_else(|err| self.swallow("image", err))
    }

    /// Top-`k` items for an uploaded image file.
    pub fn try_image_bytes_search(&self, image: &[u8], k: usize) -> Result<Vec<Item>, SearchError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.encoder.encode_image(image)?;
        self.neighbors(&vector, k)
    }

    pub fn image_bytes_search(&self, image: &[u8], k: usize) -> Vec<Item> {
        self.try_image_bytes_search(image, k)
            .unwrap_or_else(|err| self.swallow("upload", err))
    }

    fn neighbors(&self, vector: &[f32], k: usize) -> Result<Vec<Item>, SearchError> {
        let hits = self.index.search(vector, k)?;
        let found = hits.len();
        let items: Vec<Item> = hits
            .into_iter()
            .filter_map(|hit| {
                self.id_map
                    .path(hit.id)
                    .map(|path| Item::new(hit.id, path, hit.score))
            })
            .collect();
        if items.len() < found {
            tracing::debug!(
                dropped = found - items.len(),
                "neighbors missing from the id map were dropped"
            );
        }
        Ok(items)
    }

    fn swallow(&self, kind: &'static str, err: SearchError) -> Vec<Item> {
        match &err {
            SearchError::UnknownId(_) => {
                tracing::warn!(kind, error = %err, "search returned no results")
            }
            _ => tracing::error!(
                kind,
                encoder = self.encoder.name(),
                error = %err,
                "search failed"
            ),
        }
        Vec::new()
    }
}

impl TextSearcher for EmbeddingSearchService {
    fn search_text(&self, query: &str, k: usize) -> Result<Vec<Item>, SearchError> {
        self.try_text_search(query, k)
    }
}

impl std::fmt::Debug for EmbeddingSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingSearchService")
            .field("encoder", &self.encoder.name())
            .field("vectors", &self.index.len())
            .field("paths", &self.id_map.len())
            .field("translator", &self.translator.is_some())
            .finish()
    }
}
