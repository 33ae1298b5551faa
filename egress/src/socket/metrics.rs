use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::metrics::{counter::Counter, gauge::Gauge};

/// Metrics for the [`Actor`](super::Actor)
#[derive(Default)]
pub struct Metrics {
    /// Number of attached pipes
    pub pipes: Gauge,

    /// Number of pipes believed to be writable
    pub active_pipes: Gauge,

    /// Number of frames accepted by a pipe
    pub frames_sent: Counter,

    /// Number of frames discarded because their pipe terminated mid-message
    pub frames_dropped: Counter,

    /// Number of frames refused because no pipe was writable
    pub would_block: Counter,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: E) -> Self {
        let metrics = Self::default();
        context.register("pipes", "Number of attached pipes", metrics.pipes.clone());
        context.register(
            "active_pipes",
            "Number of pipes believed to be writable",
            metrics.active_pipes.clone(),
        );
        context.register(
            "frames_sent",
            "Number of frames accepted by a pipe",
            metrics.frames_sent.clone(),
        );
        context.register(
            "frames_dropped",
            "Number of frames discarded because their pipe terminated mid-message",
            metrics.frames_dropped.clone(),
        );
        context.register(
            "would_block",
            "Number of frames refused because no pipe was writable",
            metrics.would_block.clone(),
        );
        metrics
    }
}
