use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;

use video_pipeline::common::{shutdown, telemetry};
use video_pipeline::config::settings::{DispatcherConfig, QueueBackend};
use video_pipeline::infrastructure::orchestrator::ecs::EcsLauncher;
use video_pipeline::infrastructure::queue::MessageQueue;
use video_pipeline::infrastructure::queue::rabbitmq::RabbitMqQueue;
use video_pipeline::infrastructure::queue::sqs::SqsQueue;
use video_pipeline::workers::dispatcher::{DispatchSettings, Dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    telemetry::init_tracing("info");

    let config = DispatcherConfig::from_env().context("Invalid dispatcher configuration")?;

    let queue: Arc<dyn MessageQueue> = match &config.backend {
        QueueBackend::Sqs { queue_url } => Arc::new(SqsQueue::new(&config.aws, queue_url)),
        QueueBackend::Amqp { url, queue } => Arc::new(
            RabbitMqQueue::new(url, queue, config.visibility_timeout)
                .await
                .context("Failed to connect to the AMQP broker")?,
        ),
    };
    let launcher = Arc::new(EcsLauncher::new(&config.aws, config.ecs.clone()));

    let dispatcher = Dispatcher::new(queue, launcher, DispatchSettings::from_config(&config));

    let cancel = CancellationToken::new();
    shutdown::cancel_on_signal(cancel.clone());

    info!("Starting dispatcher...");
    dispatcher.run(cancel).await;

    Ok(())
}
