use async_trait::async_trait;
use aws_sdk_ecs::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};
use aws_sdk_ecs::Client;
use tracing::info;

use super::{ContainerLauncher, LaunchReceipt, LaunchRequest};
use crate::common::error::LaunchError;
use crate::config::settings::{AwsSettings, EcsSettings};

/// Launches one Fargate task per job via `RunTask`.
pub struct EcsLauncher {
    client: Client,
    settings: EcsSettings,
}

impl EcsLauncher {
    pub fn new(aws: &AwsSettings, settings: EcsSettings) -> Self {
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

        info!("✅ ECS client ready for cluster {}", settings.cluster_arn);

        Self {
            client: Client::from_conf(config),
            settings,
        }
    }

    fn network_configuration(&self) -> Result<NetworkConfiguration, LaunchError> {
        let assign_public_ip = if self.settings.assign_public_ip {
            AssignPublicIp::Enabled
        } else {
            AssignPublicIp::Disabled
        };

        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(self.settings.subnets.clone()))
            .security_groups(&self.settings.security_group)
            .assign_public_ip(assign_public_ip)
            .build()
            .map_err(|e| LaunchError::InvalidRequest(e.to_string()))?;

        Ok(NetworkConfiguration::builder().awsvpc_configuration(vpc).build())
    }

    fn overrides(&self, request: &LaunchRequest) -> TaskOverride {
        let environment = request
            .environment()
            .into_iter()
            .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
            .collect::<Vec<_>>();

        let container = ContainerOverride::builder()
            .name(&self.settings.container_name)
            .set_environment(Some(environment))
            .build();

        TaskOverride::builder().container_overrides(container).build()
    }
}

#[async_trait]
impl ContainerLauncher for EcsLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, LaunchError> {
        let output = self
            .client
            .run_task()
            .task_definition(&self.settings.task_definition)
            .cluster(&self.settings.cluster_arn)
            .launch_type(LaunchType::Fargate)
            .count(1)
            .network_configuration(self.network_configuration()?)
            .overrides(self.overrides(request))
            .send()
            .await
            .map_err(|e| LaunchError::Call(DisplayErrorContext(&e).to_string()))?;

        // RunTask reports capacity and placement problems in `failures`
        // while still returning a successful response.
        if let Some(failure) = output.failures.unwrap_or_default().into_iter().next() {
            return Err(LaunchError::Rejected(format!(
                "{} ({})",
                failure.reason.unwrap_or_else(|| "unknown reason".to_string()),
                failure.arn.unwrap_or_default()
            )));
        }

        let task_id = output
            .tasks
            .unwrap_or_default()
            .into_iter()
            .find_map(|task| task.task_arn)
            .ok_or_else(|| LaunchError::Rejected("RunTask started no task".to_string()))?;

        Ok(LaunchReceipt { task_id })
    }
}
