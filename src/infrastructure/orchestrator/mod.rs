use std::fmt;

use async_trait::async_trait;

use crate::common::error::LaunchError;
use crate::modules::transcode::events::StoreLocation;

pub mod ecs;

/// Storage credentials handed to the launched worker through its environment.
#[derive(Clone)]
pub struct CredentialsContext {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub s3_endpoint: Option<String>,
}

impl fmt::Debug for CredentialsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsContext")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("s3_endpoint", &self.s3_endpoint)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub source: StoreLocation,
    pub output_container: String,
    pub credentials: CredentialsContext,
}

impl LaunchRequest {
    /// The worker's environment contract, in a stable order.
    pub fn environment(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("SOURCE_CONTAINER", self.source.container.clone()),
            ("SOURCE_KEY", self.source.key.clone()),
            ("OUTPUT_CONTAINER", self.output_container.clone()),
            ("AWS_REGION", self.credentials.region.clone()),
            ("AWS_ACCESS_KEY_ID", self.credentials.access_key_id.clone()),
            ("AWS_SECRET_ACCESS_KEY", self.credentials.secret_access_key.clone()),
        ];
        if let Some(endpoint) = &self.credentials.s3_endpoint {
            env.push(("S3_ENDPOINT", endpoint.clone()));
        }
        env
    }
}

/// Identifier the orchestrator assigned to a started execution unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReceipt {
    pub task_id: String,
}

#[async_trait]
pub trait ContainerLauncher: Send + Sync {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, LaunchError>;
}
