pub mod connection;
pub mod consumer;
pub mod error;
pub mod message;
pub mod metrics;
pub mod reply;
pub mod transport;

pub use connection::{AmqpConnection, AmqpReplyChannel, PREFETCH_COUNT};
pub use consumer::{ConsumerState, RpcConsumer};
pub use error::RpcError;
pub use message::{CorrelationContext, InboundMessage};
pub use metrics::{ConsumerMetrics, LoggingMetricsBackend, MetricsBackend, MetricsSnapshot};
pub use reply::ReplyRouter;
pub use transport::{
    MessageSource, PublishedReply, RecordingReplyChannel, ReplyChannel, ScriptedSource, SourceLog,
    TransportFuture,
};
