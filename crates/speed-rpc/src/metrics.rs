use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for metrics backends. Implementations can forward counters to an
/// exporter or simply log them.
pub trait MetricsBackend: Send + Sync {
    fn record_counter(&self, name: &str, value: u64);
}

/// Atomic counters for the consume loop.
pub struct ConsumerMetrics {
    pub messages_received: AtomicU64,
    pub replies_ok: AtomicU64,
    pub replies_error: AtomicU64,
    pub messages_rejected: AtomicU64,
    pub publish_failures: AtomicU64,
    backend: Option<Arc<dyn MetricsBackend>>,
}

impl std::fmt::Debug for ConsumerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerMetrics")
            .field("messages_received", &self.messages_received)
            .field("replies_ok", &self.replies_ok)
            .field("replies_error", &self.replies_error)
            .field("messages_rejected", &self.messages_rejected)
            .field("publish_failures", &self.publish_failures)
            .finish()
    }
}

impl Default for ConsumerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self {
            messages_received: AtomicU64::new(0),
            replies_ok: AtomicU64::new(0),
            replies_error: AtomicU64::new(0),
            messages_rejected: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            backend: None,
        }
    }

    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            backend: Some(backend),
            ..Self::new()
        }
    }

    fn bump(&self, counter: &AtomicU64, name: &str) {
        let val = counter.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(backend) = &self.backend {
            backend.record_counter(name, val);
        }
    }

    pub fn record_received(&self) {
        self.bump(&self.messages_received, "speed.rpc.messages_received");
    }

    pub fn record_replied(&self, ok: bool) {
        if ok {
            self.bump(&self.replies_ok, "speed.rpc.replies_ok");
        } else {
            self.bump(&self.replies_error, "speed.rpc.replies_error");
        }
    }

    pub fn record_rejected(&self) {
        self.bump(&self.messages_rejected, "speed.rpc.messages_rejected");
    }

    pub fn record_publish_failed(&self) {
        self.bump(&self.publish_failures, "speed.rpc.publish_failures");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            replies_ok: self.replies_ok.load(Ordering::Relaxed),
            replies_error: self.replies_error.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of consumer metrics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub replies_ok: u64,
    pub replies_error: u64,
    pub messages_rejected: u64,
    pub publish_failures: u64,
}

/// Emits metrics as structured log events.
pub struct LoggingMetricsBackend;

impl MetricsBackend for LoggingMetricsBackend {
    fn record_counter(&self, name: &str, value: u64) {
        tracing::debug!(metric = name, value = value, kind = "counter", "metric");
    }
}
