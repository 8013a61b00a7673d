use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{error, info};

use video_pipeline::common::telemetry;
use video_pipeline::config::settings::WorkerConfig;
use video_pipeline::infrastructure::encoder::ffmpeg::FfmpegEncoder;
use video_pipeline::infrastructure::storage::s3::StorageService;
use video_pipeline::workers::transcoder::Transcoder;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    telemetry::init_tracing("info");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid worker configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    let transcoder = Transcoder::new(
        Arc::new(StorageService::new(&config.aws)),
        Arc::new(FfmpegEncoder::new(config.ffmpeg_path.clone())),
        config.renditions.clone(),
        config.work_dir.clone(),
    );

    match transcoder.run(Arc::new(config.job)).await {
        Ok(report) => {
            info!(
                "Job finished: {:?}, source deleted: {}",
                report.outcome, report.source_deleted
            );
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            error!("Job aborted: {}", e);
            ExitCode::from(1)
        }
    }
}
