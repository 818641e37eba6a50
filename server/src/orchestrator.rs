//! Deployment orchestration
//!
//! Drives one deployment from prompt to terminal state: extraction,
//! staged missing-information responses, validation, record creation,
//! best-effort webhook registration, and delegation to the platform
//! driver. Also handles push-event re-triggers for existing deployments.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::ServiceError;
use crate::extract;
use crate::github::{self, GithubClient, WebhookOutcome};
use crate::models::deployment::{BuildLogLevel, DeploymentStatus, Environment};
use crate::platform::driver::PlatformDriver;
use crate::platform::PlatformApi;
use crate::registry::DeploymentRegistry;
use crate::settings::Settings;

/// Example repository URLs offered when a prompt lacks one
const REPO_EXAMPLES: [&str; 2] = [
    "https://github.com/username/my-app",
    "https://github.com/username/sample-app",
];

/// Outcome of submitting a deployment prompt.
///
/// Missing information is not an error: the caller is asked for one
/// specific fact at a time, repository first, and no record is created
/// until both facts are present and valid.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmitOutcome {
    NeedsRepository {
        message: String,
        examples: Vec<String>,
    },
    NeedsEnvironment {
        message: String,
        choices: Vec<String>,
    },
    Success {
        deployment_id: String,
        deployment_url: String,
        message: String,
    },
}

/// Outcome of an inbound push event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushOutcome {
    /// No matching record, or the record has no remote service yet;
    /// acknowledged without action
    Ignored { reason: String },

    /// A redeploy was triggered against the stored service
    Retriggered { deployment_id: String },
}

/// Deployment orchestrator
pub struct Orchestrator {
    registry: Arc<DeploymentRegistry>,
    api: Arc<dyn PlatformApi>,
    driver: PlatformDriver,
    github: GithubClient,
    settings: Settings,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<DeploymentRegistry>,
        api: Arc<dyn PlatformApi>,
        settings: Settings,
    ) -> Result<Self, ServiceError> {
        let driver = PlatformDriver::new(api.clone(), registry.clone(), settings.platform.clone());
        let github = GithubClient::new(settings.github.clone())?;
        Ok(Self {
            registry,
            api,
            driver,
            github,
            settings,
        })
    }

    /// Start a deployment from a free-text prompt
    pub async fn submit(&self, prompt: &str) -> Result<SubmitOutcome, ServiceError> {
        info!("Analyzing deployment request");
        let intent = extract::extract_intent(prompt, &self.settings.llm).await;

        // Staged information gathering: ask for the repository before the
        // environment, and create no record until both are known
        let repo_url = match &intent.repo_url {
            Some(repo_url) => repo_url.clone(),
            None => {
                return Ok(SubmitOutcome::NeedsRepository {
                    message: "Could not identify a GitHub repository from your request. \
                              Please include a repository URL."
                        .to_string(),
                    examples: REPO_EXAMPLES.iter().map(|s| s.to_string()).collect(),
                })
            }
        };
        let environment = match intent.environment {
            Some(environment) => environment,
            None => {
                return Ok(SubmitOutcome::NeedsEnvironment {
                    message: "Environment not specified. Please provide one of: dev, qa, beta, prod."
                        .to_string(),
                    choices: environment_choices(),
                })
            }
        };

        // Structurally invalid references are rejected before any side effects
        if !github::validate_repo_url(&repo_url) {
            return Err(ServiceError::ValidationError(format!(
                "invalid GitHub repository URL: {}",
                repo_url
            )));
        }

        let deployment_dir = format!(
            "{}/{}",
            self.settings.platform.deployment_dir.trim_end_matches('/'),
            environment
        );
        let deployment_id =
            self.registry
                .create(&repo_url, environment, prompt, Some(deployment_dir));
        info!("Created deployment {} for {}", deployment_id, repo_url);

        self.registry.set_extracted_details(
            &deployment_id,
            Some(intent.deployment_kind.clone()),
            intent.requirements.clone(),
        )?;
        self.registry
            .update_status(&deployment_id, DeploymentStatus::InProgress, None)?;
        self.registry.add_build_log(
            &deployment_id,
            BuildLogLevel::Info,
            format!("Starting {} deployment", intent.deployment_kind),
            "initialization",
        )?;

        self.register_webhook(&deployment_id, &repo_url).await;

        match self.driver.deploy(&repo_url, environment, &deployment_id).await {
            Ok(url) => {
                self.registry
                    .update_status(&deployment_id, DeploymentStatus::Completed, None)?;
                self.registry.add_build_log(
                    &deployment_id,
                    BuildLogLevel::Info,
                    "Deployment completed successfully",
                    "completed",
                )?;
                info!("Deployment {} completed: {}", deployment_id, url);
                Ok(SubmitOutcome::Success {
                    deployment_id,
                    deployment_url: url.clone(),
                    message: format!(
                        "Deployment initiated successfully for {} to {} environment",
                        repo_url, environment
                    ),
                })
            }
            Err(e) => {
                error!("Deployment {} failed: {}", deployment_id, e);
                // The record must end terminal and inspectable even if these
                // bookkeeping writes race a concurrent reader
                let _ = self.registry.add_build_log(
                    &deployment_id,
                    BuildLogLevel::Error,
                    format!("Deployment failed: {}", e),
                    "failed",
                );
                let _ = self.registry.update_status(
                    &deployment_id,
                    DeploymentStatus::Failed,
                    Some(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// Best-effort source-control webhook registration; failure is logged
    /// and never aborts the deployment
    async fn register_webhook(&self, deployment_id: &str, repo_url: &str) {
        match self.github.register_push_webhook(repo_url).await {
            WebhookOutcome::Created => {
                let _ = self.registry.mark_webhook_configured(deployment_id);
                let _ = self.registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Info,
                    "GitHub webhook registered for automatic redeployment",
                    "webhook_setup",
                );
            }
            WebhookOutcome::AlreadyExists => {
                let _ = self.registry.mark_webhook_configured(deployment_id);
                let _ = self.registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Info,
                    "GitHub webhook already registered",
                    "webhook_setup",
                );
            }
            WebhookOutcome::Failed(reason) => {
                warn!("Could not configure GitHub webhook: {}", reason);
                let _ = self.registry.add_build_log(
                    deployment_id,
                    BuildLogLevel::Warning,
                    format!("Could not configure GitHub webhook: {}", reason),
                    "webhook_setup",
                );
            }
        }
    }

    /// Handle an inbound push event by re-triggering the latest deployment
    /// recorded for the repository.
    ///
    /// No new record is created; the existing record's identity and service
    /// binding are reused. Unmatched repositories and records without a
    /// service id are acknowledged as no-ops.
    pub async fn handle_push(
        &self,
        repo_full_name: &str,
        commit_id: &str,
        commit_message: &str,
    ) -> Result<PushOutcome, ServiceError> {
        let record = match self.registry.latest_for_repo(repo_full_name) {
            Some(record) => record,
            None => {
                info!("Push event for {} matched no deployment", repo_full_name);
                return Ok(PushOutcome::Ignored {
                    reason: format!("no deployment recorded for {}", repo_full_name),
                });
            }
        };

        let service_id = match &record.platform_service_id {
            Some(service_id) => service_id.clone(),
            None => {
                info!(
                    "Push event for {} matched deployment {} without a service",
                    repo_full_name, record.id
                );
                return Ok(PushOutcome::Ignored {
                    reason: format!("deployment {} has no platform service", record.id),
                });
            }
        };

        self.registry.add_build_log(
            &record.id,
            BuildLogLevel::Info,
            format!(
                "Push received for {}: {} ({})",
                repo_full_name,
                commit_message.lines().next().unwrap_or(""),
                commit_id
            ),
            "redeploy",
        )?;

        match self.api.trigger_deploy(&service_id).await {
            Ok(deploy_id) => {
                self.registry.add_build_log(
                    &record.id,
                    BuildLogLevel::Info,
                    format!("Redeploy triggered (deploy {})", deploy_id),
                    "redeploy",
                )?;
                info!("Redeploy triggered for deployment {}", record.id);
                Ok(PushOutcome::Retriggered {
                    deployment_id: record.id,
                })
            }
            Err(e) => {
                error!("Redeploy trigger failed for deployment {}: {}", record.id, e);
                self.registry.add_build_log(
                    &record.id,
                    BuildLogLevel::Error,
                    format!("Redeploy trigger failed: {}", e),
                    "redeploy",
                )?;
                Err(e)
            }
        }
    }
}

fn environment_choices() -> Vec<String> {
    [
        Environment::Dev,
        Environment::Qa,
        Environment::Beta,
        Environment::Prod,
    ]
    .iter()
    .map(|e| e.as_str().to_string())
    .collect()
}
