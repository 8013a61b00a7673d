use std::collections::HashMap;
use std::str::FromStr;

use crate::common::error::ConfigError;

pub enum EnvKey {
    ServerPort,
    AwsRegion,
    AwsAccessKey,
    AwsSecretKey,
    S3Endpoint,
    UploadBucket,
    UploadUrlExpirySeconds,
    QueueBackend,
    SqsQueueUrl,
    AmqpUrl,
    AmqpQueue,
    QueueWaitSeconds,
    QueueMaxMessages,
    QueueVisibilityTimeoutSeconds,
    ReceiveErrorPauseSeconds,
    OutputBucket,
    EcsTaskDefinition,
    EcsClusterArn,
    EcsSubnets,
    EcsSecurityGroup,
    EcsContainerName,
    EcsAssignPublicIp,
    SourceContainer,
    SourceKey,
    OutputContainer,
    WorkDir,
    FfmpegPath,
    Renditions,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::AwsRegion => "AWS_REGION",
            EnvKey::AwsAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::AwsSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::S3Endpoint => "S3_ENDPOINT",
            EnvKey::UploadBucket => "UPLOAD_BUCKET_NAME",
            EnvKey::UploadUrlExpirySeconds => "UPLOAD_URL_EXPIRY_SECONDS",
            EnvKey::QueueBackend => "QUEUE_BACKEND",
            EnvKey::SqsQueueUrl => "SQS_QUEUE_URL",
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::AmqpQueue => "AMQP_QUEUE",
            EnvKey::QueueWaitSeconds => "QUEUE_WAIT_SECONDS",
            EnvKey::QueueMaxMessages => "QUEUE_MAX_MESSAGES",
            EnvKey::QueueVisibilityTimeoutSeconds => "QUEUE_VISIBILITY_TIMEOUT_SECONDS",
            EnvKey::ReceiveErrorPauseSeconds => "RECEIVE_ERROR_PAUSE_SECONDS",
            EnvKey::OutputBucket => "OUTPUT_BUCKET_NAME",
            EnvKey::EcsTaskDefinition => "ECS_TASK_DEFINITION",
            EnvKey::EcsClusterArn => "ECS_CLUSTER_ARN",
            EnvKey::EcsSubnets => "ECS_SUBNETS",
            EnvKey::EcsSecurityGroup => "ECS_SECURITY_GROUP",
            EnvKey::EcsContainerName => "ECS_CONTAINER_NAME",
            EnvKey::EcsAssignPublicIp => "ECS_ASSIGN_PUBLIC_IP",
            EnvKey::SourceContainer => "SOURCE_CONTAINER",
            EnvKey::SourceKey => "SOURCE_KEY",
            EnvKey::OutputContainer => "OUTPUT_CONTAINER",
            EnvKey::WorkDir => "WORK_DIR",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::Renditions => "RENDITIONS",
        }
    }
}

/// Where settings read their variables from. The process environment in the
/// binaries, a plain map in tests.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

pub fn get(source: &dyn EnvSource, key: EnvKey) -> Result<String, ConfigError> {
    source
        .var(key.as_str())
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key.as_str()))
}

pub fn get_opt(source: &dyn EnvSource, key: EnvKey) -> Option<String> {
    source
        .var(key.as_str())
        .filter(|value| !value.trim().is_empty())
}

pub fn get_or(source: &dyn EnvSource, key: EnvKey, default: &str) -> String {
    get_opt(source, key).unwrap_or_else(|| default.to_string())
}

pub fn get_parsed<T: FromStr>(source: &dyn EnvSource, key: EnvKey, default: T) -> T {
    match get_opt(source, key) {
        Some(val) => val.trim().parse::<T>().unwrap_or(default),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn blank_values_count_as_missing() {
        let env = source(&[("SOURCE_KEY", "  ")]);
        let err = get(&env, EnvKey::SourceKey).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SOURCE_KEY")));
    }

    #[test]
    fn get_parsed_falls_back_on_garbage() {
        let env = source(&[("APP_PORT", "not-a-port"), ("QUEUE_WAIT_SECONDS", " 5 ")]);
        assert_eq!(get_parsed(&env, EnvKey::ServerPort, 3000u16), 3000);
        assert_eq!(get_parsed(&env, EnvKey::QueueWaitSeconds, 20i32), 5);
    }
}
