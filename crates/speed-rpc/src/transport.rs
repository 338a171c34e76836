use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::error::RpcError;
use crate::message::InboundMessage;

pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RpcError>> + Send + 'a>>;

/// Inbound side of the broker: a started consumer on the request queue.
pub trait MessageSource: Send {
    /// Begin consuming. Deliveries are only handed out after this.
    fn start(&mut self) -> TransportFuture<'_, ()>;

    /// Next delivery in queue order. `Ok(None)` means the broker closed the
    /// consumer stream. Must be cancel safe.
    fn next_message(&mut self) -> TransportFuture<'_, Option<InboundMessage>>;

    fn ack<'a>(&'a self, message: &'a InboundMessage) -> TransportFuture<'a, ()>;

    /// Reject without requeue.
    fn reject<'a>(&'a self, message: &'a InboundMessage) -> TransportFuture<'a, ()>;

    fn close(&mut self) -> TransportFuture<'_, ()>;
}

/// Outbound side of the broker: direct publish to a named queue.
pub trait ReplyChannel: Send + Sync {
    fn publish<'a>(
        &'a self,
        reply_to: &'a str,
        correlation_id: Option<&'a str>,
        payload: &'a [u8],
    ) -> TransportFuture<'a, ()>;
}

/// What a [`ScriptedSource`] observed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceLog {
    pub started: bool,
    pub acked: Vec<u64>,
    pub rejected: Vec<u64>,
    pub closed: bool,
}

/// In-memory source that replays a fixed script of deliveries.
///
/// Once the script is exhausted it either reports a closed stream or, when
/// held open, waits forever like an idle queue.
pub struct ScriptedSource {
    script: VecDeque<Result<InboundMessage, RpcError>>,
    hold_open: bool,
    log: Arc<Mutex<SourceLog>>,
}

impl ScriptedSource {
    pub fn new(messages: impl IntoIterator<Item = InboundMessage>) -> Self {
        Self {
            script: messages.into_iter().map(Ok).collect(),
            hold_open: false,
            log: Arc::new(Mutex::new(SourceLog::default())),
        }
    }

    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Append a broker-side failure to the script.
    pub fn then_fail(mut self, error: RpcError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn log(&self) -> Arc<Mutex<SourceLog>> {
        Arc::clone(&self.log)
    }

    fn record(&self, f: impl FnOnce(&mut SourceLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }
}

impl MessageSource for ScriptedSource {
    fn start(&mut self) -> TransportFuture<'_, ()> {
        self.record(|log| log.started = true);
        Box::pin(async { Ok::<(), RpcError>(()) })
    }

    fn next_message(&mut self) -> TransportFuture<'_, Option<InboundMessage>> {
        Box::pin(async move {
            match self.script.pop_front() {
                Some(Ok(message)) => Ok(Some(message)),
                Some(Err(e)) => Err(e),
                None if self.hold_open => std::future::pending().await,
                None => Ok(None),
            }
        })
    }

    fn ack<'a>(&'a self, message: &'a InboundMessage) -> TransportFuture<'a, ()> {
        self.record(|log| log.acked.push(message.delivery_tag));
        Box::pin(async { Ok::<(), RpcError>(()) })
    }

    fn reject<'a>(&'a self, message: &'a InboundMessage) -> TransportFuture<'a, ()> {
        self.record(|log| log.rejected.push(message.delivery_tag));
        Box::pin(async { Ok::<(), RpcError>(()) })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        self.record(|log| log.closed = true);
        Box::pin(async { Ok::<(), RpcError>(()) })
    }
}

/// A reply captured by [`RecordingReplyChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReply {
    pub reply_to: String,
    pub correlation_id: Option<String>,
    pub payload: Vec<u8>,
}

/// Reply channel that records every publish instead of sending it.
#[derive(Default)]
pub struct RecordingReplyChannel {
    published: Mutex<Vec<PublishedReply>>,
    fail_with: Option<String>,
}

impl RecordingReplyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn published(&self) -> Vec<PublishedReply> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl ReplyChannel for RecordingReplyChannel {
    fn publish<'a>(
        &'a self,
        reply_to: &'a str,
        correlation_id: Option<&'a str>,
        payload: &'a [u8],
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            if let Some(message) = &self.fail_with {
                return Err(RpcError::Publish(message.clone()));
            }
            if let Ok(mut published) = self.published.lock() {
                published.push(PublishedReply {
                    reply_to: reply_to.to_string(),
                    correlation_id: correlation_id.map(str::to_string),
                    payload: payload.to_vec(),
                });
            }
            Ok(())
        })
    }
}
