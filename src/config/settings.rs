use std::path::PathBuf;
use std::time::Duration;

use crate::common::error::ConfigError;
use crate::config::env::{self, EnvKey, EnvSource};
use crate::infrastructure::orchestrator::CredentialsContext;
use crate::modules::transcode::events::StoreLocation;
use crate::modules::transcode::model::{JobContext, RenditionSpec};

#[derive(Clone, Debug)]
pub struct AwsSettings {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Set for S3-compatible stores such as MinIO.
    pub s3_endpoint: Option<String>,
}

impl AwsSettings {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            region: env::get_or(source, EnvKey::AwsRegion, "us-east-1"),
            access_key_id: env::get(source, EnvKey::AwsAccessKey)?,
            secret_access_key: env::get(source, EnvKey::AwsSecretKey)?,
            s3_endpoint: env::get_opt(source, EnvKey::S3Endpoint),
        })
    }

    pub fn credentials_context(&self) -> CredentialsContext {
        CredentialsContext {
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            s3_endpoint: self.s3_endpoint.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub server_port: u16,
    pub upload_bucket: String,
    pub upload_url_expiry: Duration,
    pub aws: AwsSettings,
}

impl ApiConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            server_port: env::get_parsed(source, EnvKey::ServerPort, 3000),
            upload_bucket: env::get(source, EnvKey::UploadBucket)?,
            upload_url_expiry: Duration::from_secs(env::get_parsed(
                source,
                EnvKey::UploadUrlExpirySeconds,
                1800,
            )),
            aws: AwsSettings::from_source(source)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&env::ProcessEnv)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueBackend {
    Sqs { queue_url: String },
    Amqp { url: String, queue: String },
}

#[derive(Clone, Debug)]
pub struct EcsSettings {
    pub task_definition: String,
    pub cluster_arn: String,
    pub subnets: Vec<String>,
    pub security_group: String,
    pub container_name: String,
    pub assign_public_ip: bool,
}

impl EcsSettings {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let subnets: Vec<String> = env::get(source, EnvKey::EcsSubnets)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if subnets.is_empty() {
            return Err(ConfigError::invalid("ECS_SUBNETS", "no subnets listed"));
        }

        Ok(Self {
            task_definition: env::get(source, EnvKey::EcsTaskDefinition)?,
            cluster_arn: env::get(source, EnvKey::EcsClusterArn)?,
            subnets,
            security_group: env::get(source, EnvKey::EcsSecurityGroup)?,
            container_name: env::get(source, EnvKey::EcsContainerName)?,
            assign_public_ip: env::get_parsed(source, EnvKey::EcsAssignPublicIp, true),
        })
    }
}

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    pub backend: QueueBackend,
    pub wait_seconds: i32,
    pub max_messages: i32,
    pub visibility_timeout: Duration,
    pub receive_error_pause: Duration,
    pub output_bucket: String,
    pub ecs: EcsSettings,
    pub aws: AwsSettings,
}

impl DispatcherConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let backend = match env::get_or(source, EnvKey::QueueBackend, "sqs")
            .to_ascii_lowercase()
            .as_str()
        {
            "sqs" => QueueBackend::Sqs {
                queue_url: env::get(source, EnvKey::SqsQueueUrl)?,
            },
            "amqp" | "rabbitmq" => QueueBackend::Amqp {
                url: env::get(source, EnvKey::AmqpUrl)?,
                queue: env::get_or(source, EnvKey::AmqpQueue, "video-uploads"),
            },
            other => {
                return Err(ConfigError::invalid(
                    "QUEUE_BACKEND",
                    format!("unknown backend `{}` (expected sqs or amqp)", other),
                ));
            }
        };

        Ok(Self {
            backend,
            // SQS caps long polls at 20 seconds and batches at 10 messages.
            wait_seconds: env::get_parsed::<i32>(source, EnvKey::QueueWaitSeconds, 20).clamp(0, 20),
            max_messages: env::get_parsed::<i32>(source, EnvKey::QueueMaxMessages, 1).clamp(1, 10),
            visibility_timeout: Duration::from_secs(env::get_parsed(
                source,
                EnvKey::QueueVisibilityTimeoutSeconds,
                30,
            )),
            receive_error_pause: Duration::from_secs(env::get_parsed(
                source,
                EnvKey::ReceiveErrorPauseSeconds,
                5,
            )),
            output_bucket: env::get(source, EnvKey::OutputBucket)?,
            ecs: EcsSettings::from_source(source)?,
            aws: AwsSettings::from_source(source)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&env::ProcessEnv)
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub job: JobContext,
    pub work_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub renditions: Vec<RenditionSpec>,
    pub aws: AwsSettings,
}

impl WorkerConfig {
    pub fn from_source(source: &dyn EnvSource) -> Result<Self, ConfigError> {
        let location = StoreLocation {
            container: env::get(source, EnvKey::SourceContainer)?,
            key: env::get(source, EnvKey::SourceKey)?,
        };
        let job = JobContext::new(location, env::get(source, EnvKey::OutputContainer)?)?;

        let renditions = match env::get_opt(source, EnvKey::Renditions) {
            Some(raw) => RenditionSpec::parse_list(&raw)?,
            None => RenditionSpec::defaults(),
        };

        Ok(Self {
            job,
            work_dir: PathBuf::from(env::get_or(source, EnvKey::WorkDir, ".")),
            ffmpeg_path: PathBuf::from(env::get_or(source, EnvKey::FfmpegPath, "ffmpeg")),
            renditions,
            aws: AwsSettings::from_source(source)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&env::ProcessEnv)
    }
}
