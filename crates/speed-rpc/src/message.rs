/// Routing metadata of one inbound message. Lives only while that message
/// is being processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationContext {
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

impl CorrelationContext {
    /// The reply destination, if present and non-blank.
    pub fn usable_reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// A message pulled from the request queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub delivery_tag: u64,
    pub body: Vec<u8>,
    pub context: CorrelationContext,
}

impl InboundMessage {
    pub fn new(delivery_tag: u64, body: impl Into<Vec<u8>>) -> Self {
        Self {
            delivery_tag,
            body: body.into(),
            context: CorrelationContext::default(),
        }
    }

    pub fn with_reply_to(mut self, reply_to: &str) -> Self {
        self.context.reply_to = Some(reply_to.to_string());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.context.correlation_id = Some(correlation_id.to_string());
        self
    }
}

impl From<lapin::message::Delivery> for InboundMessage {
    fn from(delivery: lapin::message::Delivery) -> Self {
        let context = CorrelationContext {
            correlation_id: delivery
                .properties
                .correlation_id()
                .as_ref()
                .map(|id| id.as_str().to_string()),
            reply_to: delivery
                .properties
                .reply_to()
                .as_ref()
                .map(|r| r.as_str().to_string()),
        };
        Self {
            delivery_tag: delivery.delivery_tag,
            body: delivery.data,
            context,
        }
    }
}
