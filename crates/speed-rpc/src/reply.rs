use std::sync::Arc;

use crate::error::RpcError;
use crate::transport::ReplyChannel;

/// Publishes a serialized response to the queue named by the request's
/// `reply_to`, echoing its correlation id.
#[derive(Clone)]
pub struct ReplyRouter {
    channel: Arc<dyn ReplyChannel>,
}

impl ReplyRouter {
    pub fn new(channel: Arc<dyn ReplyChannel>) -> Self {
        Self { channel }
    }

    pub async fn reply(
        &self,
        correlation_id: Option<&str>,
        reply_to: &str,
        payload: &[u8],
    ) -> Result<(), RpcError> {
        self.channel.publish(reply_to, correlation_id, payload).await?;
        tracing::debug!(
            reply_to,
            correlation_id = correlation_id.unwrap_or_default(),
            payload = %String::from_utf8_lossy(payload),
            "Reply sent"
        );
        Ok(())
    }
}
