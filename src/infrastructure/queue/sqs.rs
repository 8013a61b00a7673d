use async_trait::async_trait;
use aws_sdk_sqs::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;
use tracing::{debug, info};

use super::{MessageQueue, QueueMessage};
use crate::common::error::QueueError;
use crate::config::settings::AwsSettings;

#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(aws: &AwsSettings, queue_url: &str) -> Self {
        let credentials = Credentials::new(
            &aws.access_key_id,
            &aws.secret_access_key,
            None,
            None,
            "static",
        );

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()))
            .credentials_provider(credentials)
            .build();

        info!("✅ SQS client ready for {}", queue_url);

        Self {
            client: Client::from_conf(config),
            queue_url: queue_url.to_string(),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(
        &self,
        max_messages: i32,
        wait_seconds: i32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        let messages: Vec<QueueMessage> = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                // Without a receipt handle the message cannot be acknowledged;
                // it will simply come back after the visibility timeout.
                let ack_token = m.receipt_handle?;
                Some(QueueMessage {
                    id: m.message_id.unwrap_or_default(),
                    ack_token,
                    body: m.body,
                })
            })
            .collect();

        debug!("Received {} message(s) from SQS", messages.len());
        Ok(messages)
    }

    async fn delete(&self, ack_token: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(ack_token)
            .send()
            .await
            .map_err(|e| QueueError::Acknowledge(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
