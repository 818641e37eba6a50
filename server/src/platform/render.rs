//! Render platform API client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::errors::ServiceError;
use crate::platform::{DeployStatus, PlatformApi, ServiceSpec};
use crate::settings::PlatformSettings;

/// REST client for the Render deployment API
pub struct RenderClient {
    client: Client,
    api_key: Option<String>,
    api_base: String,
}

impl RenderClient {
    /// Create a new Render client.
    ///
    /// A missing API key is not an error here; calls fail with a
    /// configuration error at provisioning time instead, so the service can
    /// start without platform credentials.
    pub fn new(settings: &PlatformSettings) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn api_key(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ServiceError::ConfigError("platform API key not configured".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ServiceCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DeployCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DeployInfo {
    status: DeployStatus,
}

#[derive(Debug, Deserialize)]
struct ServiceEnvelope {
    service: ServiceInfo,
}

#[derive(Debug, Deserialize)]
struct ServiceInfo {
    url: String,
}

#[async_trait]
impl PlatformApi for RenderClient {
    async fn create_service(&self, spec: &ServiceSpec) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;
        let url = format!("{}/services", self.api_base);
        debug!("POST {} (service creation)", url);

        let env_vars: Vec<serde_json::Value> = spec
            .plan
            .env_vars
            .iter()
            .map(|(key, value)| serde_json::json!({ "key": key, "value": value }))
            .collect();

        let body = serde_json::json!({
            "name": spec.name,
            "type": "web_service",
            "env": spec.plan.env,
            "plan": "free",
            "region": spec.region,
            "repo": spec.repo_url,
            "branch": "main",
            "buildCommand": spec.plan.build_command,
            "startCommand": spec.plan.start_command,
            "envVars": env_vars,
            "autoDeploy": true,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        // Provisioning failures are not transient; anything but 201 is fatal
        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::PlatformError(format!(
                "failed to create service: {} - {}",
                status, text
            )));
        }

        let created: ServiceCreated = response.json().await?;
        Ok(created.id)
    }

    async fn trigger_deploy(&self, service_id: &str) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;
        let url = format!("{}/services/{}/deploys", self.api_base, service_id);
        debug!("POST {} (deploy trigger)", url);

        let response = self.client.post(&url).bearer_auth(api_key).send().await?;

        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::PlatformError(format!(
                "failed to trigger deploy: {} - {}",
                status, text
            )));
        }

        let created: DeployCreated = response.json().await?;
        Ok(created.id)
    }

    async fn get_deploy_status(
        &self,
        service_id: &str,
        deploy_id: &str,
    ) -> Result<DeployStatus, ServiceError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/services/{}/deploys/{}",
            self.api_base, service_id, deploy_id
        );
        debug!("GET {} (deploy status)", url);

        let response = self.client.get(&url).bearer_auth(api_key).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::PlatformError(format!(
                "failed to check deploy status: {} - {}",
                status, text
            )));
        }

        let info: DeployInfo = response.json().await?;
        Ok(info.status)
    }

    async fn get_service_url(&self, service_id: &str) -> Result<String, ServiceError> {
        let api_key = self.api_key()?;
        let url = format!("{}/services/{}", self.api_base, service_id);
        debug!("GET {} (service lookup)", url);

        let response = self.client.get(&url).bearer_auth(api_key).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::PlatformError(format!(
                "failed to get service URL: {} - {}",
                status, text
            )));
        }

        let envelope: ServiceEnvelope = response.json().await?;
        Ok(envelope.service.url)
    }
}
