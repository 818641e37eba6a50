//! Service settings
//!
//! Loaded from environment variables with documented defaults. Every group
//! also carries serde defaults so a settings file can be deserialized in
//! tests and tooling.

use std::env;

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// GitHub integration configuration
    #[serde(default)]
    pub github: GithubSettings,

    /// Deployment platform configuration
    #[serde(default)]
    pub platform: PlatformSettings,

    /// LLM extraction configuration
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("LOG_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            server: ServerSettings {
                host: env::var("HOST").unwrap_or_else(|_| default_host()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_port),
            },
            github: GithubSettings {
                token: env::var("GITHUB_TOKEN").ok(),
                webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_else(|_| default_webhook_secret()),
                webhook_url: env::var("WEBHOOK_URL").unwrap_or_else(|_| default_webhook_url()),
                api_base: env::var("GITHUB_API_BASE").unwrap_or_else(|_| default_github_api_base()),
            },
            platform: PlatformSettings {
                api_key: env::var("RENDER_API_KEY").ok(),
                api_base: env::var("RENDER_API_BASE").unwrap_or_else(|_| default_platform_api_base()),
                region: env::var("RENDER_REGION").unwrap_or_else(|_| default_region()),
                deployment_dir: env::var("DEPLOYMENT_DIR").unwrap_or_else(|_| default_deployment_dir()),
            },
            llm: LlmSettings {
                api_key: env::var("OPENAI_API_KEY").ok(),
                api_base: env::var("OPENAI_API_BASE").unwrap_or_else(|_| default_llm_api_base()),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| default_llm_model()),
            },
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// GitHub integration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSettings {
    /// API token used for webhook registration; registration is skipped
    /// (non-fatally) when absent
    #[serde(default)]
    pub token: Option<String>,

    /// Shared secret for inbound webhook signatures
    #[serde(default = "default_webhook_secret")]
    pub webhook_secret: String,

    /// Callback URL registered on repositories
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// GitHub REST API base URL
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
}

fn default_webhook_secret() -> String {
    "supersecret".to_string()
}

fn default_webhook_url() -> String {
    "http://localhost:8000/webhook/github".to_string()
}

fn default_github_api_base() -> String {
    "https://api.github.com".to_string()
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            token: None,
            webhook_secret: default_webhook_secret(),
            webhook_url: default_webhook_url(),
            api_base: default_github_api_base(),
        }
    }
}

/// Deployment platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSettings {
    /// Platform API key; deployments fail at provisioning time when absent
    #[serde(default)]
    pub api_key: Option<String>,

    /// Platform REST API base URL
    #[serde(default = "default_platform_api_base")]
    pub api_base: String,

    /// Region services are provisioned in
    #[serde(default = "default_region")]
    pub region: String,

    /// Local directory for repository checkouts
    #[serde(default = "default_deployment_dir")]
    pub deployment_dir: String,
}

fn default_platform_api_base() -> String {
    "https://api.render.com/v1".to_string()
}

fn default_region() -> String {
    "oregon".to_string()
}

fn default_deployment_dir() -> String {
    "/tmp/deployments".to_string()
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_platform_api_base(),
            region: default_region(),
            deployment_dir: default_deployment_dir(),
        }
    }
}

/// LLM extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// API key; extraction falls back to pattern matching when absent
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chat completions API base URL
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Model identifier
    #[serde(default = "default_llm_model")]
    pub model: String,
}

fn default_llm_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_llm_api_base(),
            model: default_llm_model(),
        }
    }
}
