use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Acknowledge failed: {0}")]
    Acknowledge(String),

    #[error("Invalid ack token: {0}")]
    InvalidAckToken(String),

    #[error("Connection failed: {0}")]
    Connection(String),
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Invalid launch request: {0}")]
    InvalidRequest(String),

    #[error("Orchestrator call failed: {0}")]
    Call(String),

    #[error("Orchestrator rejected the task: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to start encoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Encoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}
