use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    BasicRejectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};

use crate::error::RpcError;
use crate::message::InboundMessage;
use crate::transport::{MessageSource, ReplyChannel, TransportFuture};

/// At most one unacknowledged request in flight per consumer.
pub const PREFETCH_COUNT: u16 = 1;

/// A live AMQP connection with one channel bound to the request queue.
pub struct AmqpConnection {
    connection: Connection,
    channel: Channel,
    queue: String,
    consumer: Option<Consumer>,
}

impl AmqpConnection {
    /// Open the connection, set prefetch and declare the request queue.
    pub async fn connect(dsn: &str, queue: &str) -> Result<Self, RpcError> {
        let connection = Connection::connect(dsn, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await?;
        let declared = channel
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await?;

        tracing::info!(
            queue,
            pending = declared.message_count(),
            consumers = declared.consumer_count(),
            "Connected to broker"
        );

        Ok(Self {
            connection,
            channel,
            queue: queue.to_string(),
            consumer: None,
        })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// A publisher sharing this connection's channel.
    pub fn reply_channel(&self) -> AmqpReplyChannel {
        AmqpReplyChannel {
            channel: self.channel.clone(),
        }
    }
}

impl MessageSource for AmqpConnection {
    fn start(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let tag = format!("speed-rpc-{}", uuid::Uuid::new_v4());
            let consumer = self
                .channel
                .basic_consume(
                    &self.queue,
                    &tag,
                    BasicConsumeOptions::default(),
                    FieldTable::default(),
                )
                .await?;
            tracing::info!(queue = %self.queue, consumer_tag = %tag, "Awaiting RPC requests");
            self.consumer = Some(consumer);
            Ok(())
        })
    }

    fn next_message(&mut self) -> TransportFuture<'_, Option<InboundMessage>> {
        Box::pin(async move {
            let consumer = self.consumer.as_mut().ok_or(RpcError::NotConsuming)?;
            match consumer.next().await {
                Some(Ok(delivery)) => Ok(Some(InboundMessage::from(delivery))),
                Some(Err(e)) => Err(RpcError::from(e)),
                None => Ok(None),
            }
        })
    }

    fn ack<'a>(&'a self, message: &'a InboundMessage) -> TransportFuture<'a, ()> {
        let channel = self.channel.clone();
        Box::pin(async move {
            channel
                .basic_ack(message.delivery_tag, BasicAckOptions::default())
                .await
                .map_err(|e| RpcError::Ack(e.to_string()))
        })
    }

    fn reject<'a>(&'a self, message: &'a InboundMessage) -> TransportFuture<'a, ()> {
        let channel = self.channel.clone();
        Box::pin(async move {
            channel
                .basic_reject(message.delivery_tag, BasicRejectOptions { requeue: false })
                .await
                .map_err(|e| RpcError::Ack(e.to_string()))
        })
    }

    fn close(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.consumer = None;
            if !self.connection.status().connected() {
                return Ok(());
            }
            self.connection.close(200, "shutdown").await?;
            tracing::info!(queue = %self.queue, "Connection closed");
            Ok(())
        })
    }
}

/// Publishes replies via the default exchange, routed by queue name.
#[derive(Clone)]
pub struct AmqpReplyChannel {
    channel: Channel,
}

impl ReplyChannel for AmqpReplyChannel {
    fn publish<'a>(
        &'a self,
        reply_to: &'a str,
        correlation_id: Option<&'a str>,
        payload: &'a [u8],
    ) -> TransportFuture<'a, ()> {
        Box::pin(async move {
            let mut properties =
                BasicProperties::default().with_content_type("application/json".into());
            if let Some(id) = correlation_id {
                properties = properties.with_correlation_id(id.into());
            }

            self.channel
                .basic_publish("", reply_to, BasicPublishOptions::default(), payload, properties)
                .await
                .map_err(|e| RpcError::Publish(e.to_string()))?
                .await
                .map_err(|e| RpcError::Publish(e.to_string()))?;
            Ok(())
        })
    }
}
