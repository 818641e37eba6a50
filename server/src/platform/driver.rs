//! Remote provisioning and deployment driver
//!
//! Turns a validated `(repo_url, environment, deployment_id)` into a live
//! service URL: fetch and classify the repository, create the remote
//! service, trigger a deploy, and poll until the platform reports a
//! terminal status.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::ServiceError;
use crate::models::deployment::{BuildLogLevel, DeploymentStatus, Environment};
use crate::platform::detect::{build_plan, detect_app_kind};
use crate::platform::{DeployStatus, PlatformApi, ServiceSpec};
use crate::registry::DeploymentRegistry;
use crate::settings::PlatformSettings;

/// Fixed interval between deploy status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum number of status polls before declaring a timeout
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// Timeout for the repository clone subprocess
const CLONE_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives one deployment against the platform API
pub struct PlatformDriver {
    api: Arc<dyn PlatformApi>,
    registry: Arc<DeploymentRegistry>,
    settings: PlatformSettings,
}

impl PlatformDriver {
    pub fn new(
        api: Arc<dyn PlatformApi>,
        registry: Arc<DeploymentRegistry>,
        settings: PlatformSettings,
    ) -> Self {
        Self {
            api,
            registry,
            settings,
        }
    }

    /// Provision and deploy; returns the live service URL
    pub async fn deploy(
        &self,
        repo_url: &str,
        environment: Environment,
        deployment_id: &str,
    ) -> Result<String, ServiceError> {
        self.log(
            deployment_id,
            format!("Starting platform deployment for {} to {}", repo_url, environment),
            "initialization",
        )?;

        // 1. Fetch and classify the repository
        self.log(deployment_id, format!("Fetching repository: {}", repo_url), "fetch")?;
        let repo_path = self.fetch_repository(repo_url, deployment_id).await?;
        let kind = detect_app_kind(&repo_path);
        self.log(
            deployment_id,
            format!("Detected application kind: {}", kind.as_str()),
            "analysis",
        )?;

        // 2. Create the remote service
        self.log(deployment_id, "Creating remote service", "service_creation")?;
        let spec = ServiceSpec {
            name: format!("{}-{}", deployment_id, environment),
            repo_url: repo_url.to_string(),
            environment,
            region: self.settings.region.clone(),
            plan: build_plan(kind, environment, repo_url),
        };
        let service_id = self.api.create_service(&spec).await?;
        self.registry.set_service_id(deployment_id, &service_id)?;
        info!("Created service {} for deployment {}", service_id, deployment_id);

        // 3. Record the deploy hook for push-driven redeploys (best-effort
        //    bookkeeping; the service itself was created with auto-deploy)
        self.log(
            deployment_id,
            format!(
                "Deploy hook available at {}/services/{}/deploys",
                self.settings.api_base.trim_end_matches('/'),
                service_id
            ),
            "webhook_setup",
        )?;

        // 4. Trigger the deploy
        self.log(deployment_id, "Triggering deployment", "deployment")?;
        let deploy_id = self.api.trigger_deploy(&service_id).await?;

        // 5. Poll until the platform reports a terminal status
        let url = wait_for_live(
            self.api.as_ref(),
            &self.registry,
            deployment_id,
            &service_id,
            &deploy_id,
            tokio::time::sleep,
        )
        .await?;

        self.registry.set_deployment_url(deployment_id, &url)?;
        self.log(
            deployment_id,
            format!("Platform deployment completed: {}", url),
            "completed",
        )?;
        Ok(url)
    }

    /// Shallow-clone the repository for marker-file inspection
    async fn fetch_repository(
        &self,
        repo_url: &str,
        deployment_id: &str,
    ) -> Result<PathBuf, ServiceError> {
        let target = PathBuf::from(format!(
            "{}/{}",
            self.settings.deployment_dir.trim_end_matches('/'),
            deployment_id
        ));
        debug!("Cloning {} into {}", repo_url, target.display());

        let clone = Command::new("git")
            .args(["clone", "--depth", "1", repo_url])
            .arg(&target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output();

        let output = match tokio::time::timeout(CLONE_TIMEOUT, clone).await {
            Ok(result) => result
                .map_err(|e| ServiceError::DeployError(format!("failed to run git clone: {}", e)))?,
            Err(_) => {
                return Err(ServiceError::DeployError(
                    "repository clone timed out".to_string(),
                ))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ServiceError::DeployError(format!(
                "failed to clone repository: {}",
                stderr.trim()
            )));
        }

        Ok(target)
    }

    fn log(
        &self,
        deployment_id: &str,
        message: impl Into<String>,
        step: &str,
    ) -> Result<(), ServiceError> {
        self.registry
            .add_build_log(deployment_id, BuildLogLevel::Info, message, step)
    }
}

/// Poll the platform until the deploy reaches a terminal status.
///
/// Three exits: a `live` status resolves and returns the service URL; an
/// explicit `failed`/`canceled` status is an immediate hard failure; and
/// exhausting the attempt budget is a timeout. Each intermediate poll
/// appends one log entry. The sleep is injected so tests can simulate time.
pub async fn wait_for_live<S, F>(
    api: &dyn PlatformApi,
    registry: &DeploymentRegistry,
    deployment_id: &str,
    service_id: &str,
    deploy_id: &str,
    sleep_fn: S,
) -> Result<String, ServiceError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut last_seen: Option<DeployStatus> = None;

    for _ in 0..MAX_POLL_ATTEMPTS {
        let status = api.get_deploy_status(service_id, deploy_id).await?;

        match status {
            DeployStatus::Building => {
                registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Info,
                    "Building application",
                    "building",
                )?;
                if last_seen != Some(DeployStatus::Building) {
                    registry.update_status(deployment_id, DeploymentStatus::Building, None)?;
                }
            }
            DeployStatus::Deploying => {
                registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Info,
                    "Deploying to platform",
                    "deploying",
                )?;
                if last_seen != Some(DeployStatus::Deploying) {
                    registry.update_status(deployment_id, DeploymentStatus::Deploying, None)?;
                }
            }
            DeployStatus::Live => {
                let url = api.get_service_url(service_id).await?;
                registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Info,
                    "Deployment successful",
                    "completed",
                )?;
                return Ok(url);
            }
            DeployStatus::Failed | DeployStatus::Canceled => {
                registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Error,
                    format!("Deployment ended with remote status: {}", status.as_str()),
                    "failed",
                )?;
                return Err(ServiceError::PlatformError(format!(
                    "deployment ended with remote status: {}",
                    status.as_str()
                )));
            }
            // Not yet started, or a status this client does not know;
            // keep polling without logging
            DeployStatus::Created | DeployStatus::Unknown => {}
        }

        last_seen = Some(status);
        sleep_fn(POLL_INTERVAL).await;
    }

    registry.add_build_log(
        deployment_id,
        BuildLogLevel::Error,
        "Deployment timed out",
        "failed",
    )?;
    Err(ServiceError::TimeoutError(format!(
        "no terminal status after {} polls",
        MAX_POLL_ATTEMPTS
    )))
}
