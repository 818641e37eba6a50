//! Platform driver for the external deployment API

pub mod detect;
pub mod driver;
pub mod render;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::deployment::Environment;
use crate::platform::detect::BuildPlan;

/// Remote deploy status reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Created,
    Building,
    Deploying,
    Live,
    Failed,
    Canceled,

    /// Any status string this client does not recognize
    #[serde(other)]
    Unknown,
}

impl DeployStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Created => "created",
            DeployStatus::Building => "building",
            DeployStatus::Deploying => "deploying",
            DeployStatus::Live => "live",
            DeployStatus::Failed => "failed",
            DeployStatus::Canceled => "canceled",
            DeployStatus::Unknown => "unknown",
        }
    }
}

/// Request to create a remote service
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Service name, `<deployment-id>-<environment>`
    pub name: String,

    /// Source repository URL
    pub repo_url: String,

    /// Target environment
    pub environment: Environment,

    /// Region to provision in
    pub region: String,

    /// Build/start command template for the detected app kind
    pub plan: BuildPlan,
}

/// The four platform operations the orchestrator depends on
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Create a remote service; returns the service id
    async fn create_service(&self, spec: &ServiceSpec) -> Result<String, ServiceError>;

    /// Trigger a deploy of a service; returns the deploy id
    async fn trigger_deploy(&self, service_id: &str) -> Result<String, ServiceError>;

    /// Query the current status of a deploy
    async fn get_deploy_status(
        &self,
        service_id: &str,
        deploy_id: &str,
    ) -> Result<DeployStatus, ServiceError>;

    /// Resolve the live URL of a service
    async fn get_service_url(&self, service_id: &str) -> Result<String, ServiceError>;
}
