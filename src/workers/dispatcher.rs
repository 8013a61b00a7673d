use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::settings::DispatcherConfig;
use crate::infrastructure::orchestrator::{ContainerLauncher, CredentialsContext, LaunchRequest};
use crate::infrastructure::queue::{MessageQueue, QueueMessage};
use crate::modules::transcode::events::NotificationEnvelope;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub output_container: String,
    pub credentials: CredentialsContext,
    pub max_messages: i32,
    pub wait_seconds: i32,
    pub receive_error_pause: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self {
            output_container: config.output_bucket.clone(),
            credentials: config.aws.credentials_context(),
            max_messages: config.max_messages,
            wait_seconds: config.wait_seconds,
            receive_error_pause: config.receive_error_pause,
        }
    }
}

/// What happened to one received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Probe event, acknowledged without launching anything.
    ProbeAcknowledged,
    /// Every record launched, message acknowledged.
    Dispatched { launched: usize },
    /// Body could not be parsed; left for redelivery.
    Unparseable,
    /// A launch failed after `launched` successful ones; left for redelivery.
    LaunchFailed { launched: usize },
    /// Launches succeeded but the acknowledgment did not; the message will be
    /// redelivered and its records launched again.
    AckFailed { launched: usize },
}

pub struct Dispatcher {
    queue: Arc<dyn MessageQueue>,
    launcher: Arc<dyn ContainerLauncher>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        launcher: Arc<dyn ContainerLauncher>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            queue,
            launcher,
            settings,
        }
    }

    /// Polls until `cancel` fires. Cancellation is only observed between
    /// receive cycles; messages already received are handled to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "📬 Dispatcher polling (wait {}s, batch {})",
            self.settings.wait_seconds, self.settings.max_messages
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.queue.receive(self.settings.max_messages, self.settings.wait_seconds) => received,
            };

            match received {
                Ok(messages) if messages.is_empty() => {
                    debug!("No message in queue");
                }
                Ok(messages) => {
                    for message in &messages {
                        self.handle_message(message).await;
                    }
                }
                Err(e) => {
                    error!("Receive failed: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.receive_error_pause) => {}
                    }
                }
            }
        }

        info!("📭 Dispatcher stopped");
    }

    pub async fn handle_message(&self, message: &QueueMessage) -> Disposition {
        let span = info_span!("message", message_id = %message.id);
        self.dispatch(message).instrument(span).await
    }

    async fn dispatch(&self, message: &QueueMessage) -> Disposition {
        info!("📦 Message received");

        let envelope = match NotificationEnvelope::parse(message.body.as_deref().unwrap_or_default()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Skipping unparseable notification, leaving it for redelivery: {}", e);
                return Disposition::Unparseable;
            }
        };

        let records = match envelope {
            NotificationEnvelope::Probe => {
                info!("Probe event, acknowledging");
                return if self.acknowledge(message).await {
                    Disposition::ProbeAcknowledged
                } else {
                    Disposition::AckFailed { launched: 0 }
                };
            }
            NotificationEnvelope::Batch(records) => records,
        };

        for (launched, record) in records.iter().enumerate() {
            let location = &record.location;
            let request = LaunchRequest {
                source: location.clone(),
                output_container: self.settings.output_container.clone(),
                credentials: self.settings.credentials.clone(),
            };

            match self.launcher.launch(&request).await {
                Ok(task) => info!(
                    key = %location.key,
                    "🚀 Launched {} for s3://{}/{}",
                    task.task_id, location.container, location.key
                ),
                Err(e) => {
                    error!(
                        key = %location.key,
                        "❌ Launch failed, leaving message for redelivery: {}", e
                    );
                    return Disposition::LaunchFailed { launched };
                }
            }
        }

        let launched = records.len();
        if launched == 0 {
            info!("Notification carries no records, acknowledging");
        }

        if self.acknowledge(message).await {
            Disposition::Dispatched { launched }
        } else {
            Disposition::AckFailed { launched }
        }
    }

    async fn acknowledge(&self, message: &QueueMessage) -> bool {
        match self.queue.delete(&message.ack_token).await {
            Ok(()) => {
                debug!("Message acknowledged");
                true
            }
            Err(e) => {
                error!("Failed to acknowledge message: {}", e);
                false
            }
        }
    }
}
