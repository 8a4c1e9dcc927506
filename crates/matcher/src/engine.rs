use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};

use crate::metrics::FusionMetrics;
use crate::resolver::ContextResolver;
use crate::search::TextSearcher;
use crate::summary::summarize;
use crate::types::{
    ContextResultSet, FusedFrame, FusionConfig, FusionError, FusionMetadata, FusionOutcome, Item,
    RankedVideo, VideoSummary,
};
use crate::video::video_id_of;


/// Per-video accumulator built while grouping result sets.
#[derive(Debug)]
struct VideoAggregate {
    video_id: String,
    contexts: BTreeSet<usize>,
    frames: Vec<Item>,
    context_best: BTreeMap<usize, Item>,
}

impl VideoAggregate {
    fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            contexts: BTreeSet::new(),
            frames: Vec::new(),
            context_best: BTreeMap::new(),
        }
    }

    fn add(&mut self, context: usize, item: &Item) {
        self.contexts.insert(context);
        self.frames.push(item.clone());
        match self.context_best.get(&context) {
            Some(best) if best.score >= item.score => {}
            _ => {
                self.context_best.insert(context, item.clone());
            }
        }
    }
}

/// Cross-context ranking of videos.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Groups hits by video, keeps videos matching at least `min_contexts`
    /// contexts (lowering the bar to 1 when none do) and ranks them.
    ///
    /// Slot `i` of `results` is context `i`; `results.len()` is the total
    /// context count used for coverage.
    pub fn rank_videos(&self, results: &[ContextResultSet], min_contexts: usize) -> FusionOutcome {
        let total_contexts = results.len();
        let aggregates = group_by_video(results);

        let requested = min_contexts.max(1);
        let mut applied = requested;
        let mut qualified: Vec<&VideoAggregate> = aggregates
            .iter()
            .filter(|agg| agg.contexts.len() >= requested)
            .collect();

        let mut relaxed = false;
        if qualified.is_empty() && requested > 1 {
            tracing::warn!(
                min_contexts = requested,
                "no video matched enough contexts, lowering threshold to 1"
            );
            applied = 1;
            relaxed = true;
            qualified = aggregates.iter().collect();
        }
        if qualified.is_empty() && total_contexts > 0 {
            tracing::warn!(contexts = total_contexts, "no video matched any context");
        }

        let mut videos: Vec<RankedVideo> = qualified
            .into_iter()
            .map(|agg| self.score(agg, total_contexts))
            .collect();
        // stable: equal scores keep first-seen order
        videos.sort_by(|a, b| b.ranking_score.total_cmp(&a.ranking_score));

        tracing::info!(
            videos = videos.len(),
            min_contexts = applied,
            relaxed,
            "multi-context fusion ranked videos"
        );
        FusionOutcome {
            videos,
            min_contexts_applied: applied,
            relaxed,
        }
    }

    /// Top `k` videos flattened into frames, best video first.
    pub fn fuse(
        &self,
        results: &[ContextResultSet],
        k: usize,
        min_contexts: usize,
    ) -> Vec<FusedFrame> {
        flatten(self.rank_videos(results, min_contexts).videos, k)
    }

    fn score(&self, agg: &VideoAggregate, total_contexts: usize) -> RankedVideo {
        let num_contexts = agg.contexts.len();
        let num_frames = agg.frames.len();
        let avg_score = if num_frames == 0 {
            0.0
        } else {
            agg.frames.iter().map(|f| f64::from(f.score)).sum::<f64>() / num_frames as f64
        };
        let max_score = agg
            .frames
            .iter()
            .map(|f| f.score)
            .fold(f32::NEG_INFINITY, f32::max);

        let ranking_score = num_contexts as f64 * self.config.coverage_weight
            + avg_score * self.config.similarity_weight
            + num_frames as f64 * self.config.evidence_weight;

        let mut top_frames = agg.frames.clone();
        top_frames.sort_by(|a, b| b.score.total_cmp(&a.score));
        top_frames.truncate(self.config.frames_per_video);

        RankedVideo {
            video_id: agg.video_id.clone(),
            ranking_score,
            num_contexts_matched: num_contexts,
            total_contexts,
            coverage: num_contexts as f64 / total_contexts.max(1) as f64,
            avg_score,
            max_score,
            num_frames,
            top_frames,
            matched_contexts: agg.contexts.iter().copied().collect(),
            context_best_frames: agg.context_best.clone(),
        }
    }
}

/// Groups every hit under its video, in first-seen video order.
fn group_by_video(results: &[ContextResultSet]) -> Vec<VideoAggregate> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut aggregates: Vec<VideoAggregate> = Vec::new();

    for (context, items) in results.iter().enumerate() {
        for item in items {
            let Some(video_id) = video_id_of(&item.path) else {
                tracing::debug!(id = item.id, "item has no video id, skipped");
                continue;
            };
            if !(-1.0..=1.0).contains(&item.score) {
                tracing::warn!(
                    id = item.id,
                    score = item.score,
                    "similarity outside [-1, 1]; coverage tiers may invert"
                );
            }
            let slot = match positions.get(video_id) {
                Some(&slot) => slot,
                None => {
                    positions.insert(video_id.to_string(), aggregates.len());
                    aggregates.push(VideoAggregate::new(video_id));
                    aggregates.len() - 1
                }
            };
            aggregates[slot].add(context, item);
        }
    }
    aggregates
}

fn flatten(videos: Vec<RankedVideo>, k: usize) -> Vec<FusedFrame> {
    videos
        .into_iter()
        .take(k)
        .flat_map(|video| {
            let fusion = FusionMetadata {
                multi_context_score: video.ranking_score,
                contexts_matched: video.num_contexts_matched,
                matched_contexts: video.matched_contexts,
                coverage: video.coverage,
            };
            video.top_frames.into_iter().map(move |item| FusedFrame {
                item,
                fusion: Some(fusion.clone()),
            })
        })
        .collect()
}

/// Multi-context keyframe search: resolve every context, then fuse.
#[derive(Clone)]
pub struct MultiContextSearch {
    resolver: ContextResolver,
    engine: FusionEngine,
    metrics: Option<Arc<dyn FusionMetrics>>,
}

impl MultiContextSearch {
    pub fn new(searcher: Arc<dyn TextSearcher>, config: FusionConfig) -> Result<Self, FusionError> {
        let engine = FusionEngine::new(config)?;
        let resolver = ContextResolver::new(searcher).with_parallel(config.parallel_contexts);
        Ok(Self {
            resolver,
            engine,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn FusionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    /// Ranked frames from the videos that best satisfy all `contexts`.
    ///
    /// Blank contexts are ignored. With a single context the searcher's own
    /// top `k` is returned without fusion metadata. `min_contexts` defaults
    /// to `min(2, contexts)`; an explicit 0 counts as 1.
    pub fn search_multi_context<S: AsRef<str> + Sync>(
        &self,
        contexts: &[S],
        k: usize,
        search_k: usize,
        min_contexts: Option<usize>,
    ) -> Vec<FusedFrame> {
        let started = Instant::now();
        let results = self.resolver.resolve(contexts, search_k);
        let total = results.len();

        if total == 0 {
            tracing::warn!("no valid contexts provided");
            return Vec::new();
        }
        tracing::info!(contexts = total, k, search_k, "multi-context search");

        if total == 1 {
            let frames: Vec<FusedFrame> = results
                .into_iter()
                .flatten()
                .take(k)
                .map(FusedFrame::plain)
                .collect();
            let videos: HashSet<&str> = frames
                .iter()
                .filter_map(|f| video_id_of(&f.item.path))
                .collect();
            self.record(total, videos.len(), false, started);
            drop(videos);
            return frames;
        }

        if self.engine.config.evidence_can_cross_tiers(search_k) {
            tracing::warn!(
                search_k,
                evidence_weight = self.engine.config.evidence_weight,
                "frame counts may outrank context coverage at this search_k"
            );
        }
        let min_contexts = min_contexts
            .map(|m| m.max(1))
            .unwrap_or_else(|| self.engine.config.max_default_min_contexts.min(total));
        let outcome = self.engine.rank_videos(&results, min_contexts);
        self.record(total, outcome.videos.len(), outcome.relaxed, started);
        flatten(outcome.videos, k)
    }

    /// One card per video, most contexts first.
    pub fn get_video_summary(&self, frames: &[FusedFrame]) -> Vec<VideoSummary> {
        summarize(frames, self.engine.config.sample_frames)
    }

    fn record(&self, total: usize, qualified: usize, relaxed: bool, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_fusion(total, qualified, relaxed, started.elapsed());
        }
    }
}

impl std::fmt::Debug for MultiContextSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiContextSearch")
            .field("resolver", &self.resolver)
            .field("engine", &self.engine)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
