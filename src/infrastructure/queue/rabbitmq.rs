use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lapin::{
    options::*, types::FieldTable, Channel, Connection, ConnectionProperties,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{MessageQueue, QueueMessage};
use crate::common::error::QueueError;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Unacknowledged deliveries of the current channel generation.
#[derive(Debug)]
struct DeliveryTracker {
    visibility_timeout: Duration,
    generation: u64,
    outstanding: HashMap<u64, Instant>,
}

impl DeliveryTracker {
    fn new(visibility_timeout: Duration) -> Self {
        Self {
            visibility_timeout,
            generation: 0,
            outstanding: HashMap::new(),
        }
    }

    /// Records a delivery and returns its ack token.
    fn track(&mut self, tag: u64, received_at: Instant) -> String {
        self.outstanding.insert(tag, received_at);
        format!("{}.{}", self.generation, tag)
    }

    /// Removes and returns the tags held for at least the visibility timeout.
    fn expired(&mut self, now: Instant) -> Vec<u64> {
        let mut expired: Vec<u64> = self
            .outstanding
            .iter()
            .filter(|(_, received)| now.duration_since(**received) >= self.visibility_timeout)
            .map(|(tag, _)| *tag)
            .collect();
        expired.sort_unstable();

        for tag in &expired {
            self.outstanding.remove(tag);
        }
        expired
    }

    /// True when the delivery is still outstanding on this generation; it is
    /// no longer tracked afterwards.
    fn take(&mut self, generation: u64, tag: u64) -> bool {
        generation == self.generation && self.outstanding.remove(&tag).is_some()
    }

    /// A new channel: the broker requeued everything unacked on the old one.
    fn reset(&mut self) {
        self.generation += 1;
        self.outstanding.clear();
    }
}

struct ChannelState {
    // Keeps the connection alive for as long as the channel is in use.
    _conn: Connection,
    channel: Channel,
    deliveries: DeliveryTracker,
}

/// AMQP backend, used where bucket notifications are published to RabbitMQ
/// (MinIO's `notify_amqp` target).
///
/// AMQP has no visibility timeout, so it is emulated: deliveries left
/// unacknowledged for longer than `visibility_timeout` are nacked with requeue
/// at the start of the next `receive`. Ack tokens are `<generation>.<tag>` so a
/// tag from a channel that has since been replaced is never acked on the new one.
pub struct RabbitMqQueue {
    url: String,
    queue: String,
    state: Mutex<ChannelState>,
}

impl RabbitMqQueue {
    async fn connect(url: &str, queue: &str) -> Result<(Connection, Channel), QueueError> {
        info!("Connecting to RabbitMQ at {}", url);
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to connect to RabbitMQ: {}", e)))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to create channel: {}", e)))?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to declare queue: {}", e)))?;

        info!("Connected to RabbitMQ, consuming '{}'", queue);
        Ok((conn, channel))
    }

    pub async fn new(url: &str, queue: &str, visibility_timeout: Duration) -> Result<Self, QueueError> {
        let (conn, channel) = Self::connect(url, queue).await?;

        Ok(Self {
            url: url.to_string(),
            queue: queue.to_string(),
            state: Mutex::new(ChannelState {
                _conn: conn,
                channel,
                deliveries: DeliveryTracker::new(visibility_timeout),
            }),
        })
    }

    async fn reconnect(&self, state: &mut ChannelState) -> Result<(), QueueError> {
        warn!("RabbitMQ channel dropped, reconnecting...");
        let (conn, channel) = Self::connect(&self.url, &self.queue).await?;
        state._conn = conn;
        state.channel = channel;
        state.deliveries.reset();
        Ok(())
    }

    async fn requeue_expired(state: &mut ChannelState) {
        for tag in state.deliveries.expired(Instant::now()) {
            let requeue = BasicNackOptions {
                multiple: false,
                requeue: true,
            };
            match state.channel.basic_nack(tag, requeue).await {
                Ok(()) => debug!("Requeued unacknowledged delivery {}", tag),
                Err(e) => warn!("Failed to requeue delivery {}: {}", tag, e),
            }
        }
    }

    async fn get_one(&self, state: &mut ChannelState) -> Result<Option<QueueMessage>, lapin::Error> {
        let message = state
            .channel
            .basic_get(&self.queue, BasicGetOptions { no_ack: false })
            .await?;

        Ok(message.map(|message| {
            let ack_token = state
                .deliveries
                .track(message.delivery.delivery_tag, Instant::now());
            QueueMessage {
                id: ack_token.clone(),
                ack_token,
                body: String::from_utf8(message.delivery.data.clone()).ok(),
            }
        }))
    }
}

fn parse_ack_token(token: &str) -> Result<(u64, u64), QueueError> {
    let invalid = || QueueError::InvalidAckToken(token.to_string());
    let (generation, tag) = token.split_once('.').ok_or_else(invalid)?;
    Ok((
        generation.parse().map_err(|_| invalid())?,
        tag.parse().map_err(|_| invalid())?,
    ))
}

#[async_trait]
impl MessageQueue for RabbitMqQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let max_messages = max_messages.max(1) as usize;
        let deadline = Instant::now() + Duration::from_secs(wait_seconds.max(0) as u64);
        let mut messages = Vec::new();

        loop {
            {
                let mut state = self.state.lock().await;
                Self::requeue_expired(&mut state).await;

                while messages.len() < max_messages {
                    let next = match self.get_one(&mut state).await {
                        Ok(next) => next,
                        Err(e) => {
                            warn!("RabbitMQ basic_get failed: {}. Retrying after reconnect.", e);
                            self.reconnect(&mut state).await?;
                            self.get_one(&mut state)
                                .await
                                .map_err(|e| QueueError::Receive(e.to_string()))?
                        }
                    };
                    match next {
                        Some(message) => messages.push(message),
                        None => break,
                    }
                }
            }

            if !messages.is_empty() || Instant::now() >= deadline {
                return Ok(messages);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete(&self, ack_token: &str) -> Result<(), QueueError> {
        let (generation, tag) = parse_ack_token(ack_token)?;
        let mut state = self.state.lock().await;

        if !state.deliveries.take(generation, tag) {
            return Err(QueueError::Acknowledge(format!(
                "delivery {} is no longer outstanding",
                ack_token
            )));
        }

        state
            .channel
            .basic_ack(tag, BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::Acknowledge(e.to_string()))
    }
}
