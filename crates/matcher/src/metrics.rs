// Metrics hooks for multi-context fusion.
//
// A `FusionMetrics` observer is handed to `MultiContextSearch` at
// construction; there is no process-wide recorder.
use std::time::Duration;

/// Observer for fusion requests.
pub trait FusionMetrics: Send + Sync {
    /// Record one fused request.
    ///
    /// `total_contexts` counts non-blank contexts, `qualified_videos` the
    /// videos that survived qualification, `relaxed` whether the threshold
    /// had to be lowered, and `latency` spans resolution plus fusion.
    fn record_fusion(
        &self,
        total_contexts: usize,
        qualified_videos: usize,
        relaxed: bool,
        latency: Duration,
    );
}
