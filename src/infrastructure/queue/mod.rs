use async_trait::async_trait;

use crate::common::error::QueueError;

pub mod rabbitmq;
pub mod sqs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub ack_token: String,
    pub body: Option<String>,
}

/// At-least-once queue with long-poll receive and explicit acknowledgment.
/// A received message that is never acknowledged becomes visible again
/// once the backend's visibility timeout elapses.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn receive(&self, max_messages: i32, wait_seconds: i32)
        -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, ack_token: &str) -> Result<(), QueueError>;
}
