//! LLM-backed extractor
//!
//! Posts a chat-completions request that demands a strict JSON object and
//! parses the reply into an `ExtractedIntent`. Every failure is surfaced as
//! an error so the caller can fall back to pattern matching.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::ServiceError;
use crate::models::deployment::ExtractedIntent;
use crate::settings::LlmSettings;

const SYSTEM_PROMPT: &str = "You extract deployment information from user requests. \
Respond with a single JSON object and nothing else, with these keys: \
\"repo_url\" (the GitHub repository URL, or null if none was given), \
\"environment\" (one of \"dev\", \"qa\", \"beta\", \"prod\", or null if none was given), \
\"deployment_type\" (a short description such as \"web application\"), \
\"requirements\" (any additional requirements mentioned, or null). \
Never invent a repository URL or an environment that the user did not state.";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default)]
    repo_url: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    deployment_type: Option<String>,
    #[serde(default)]
    requirements: Option<String>,
}

/// Extract intent via the chat completions API
pub async fn extract(prompt: &str, settings: &LlmSettings) -> Result<ExtractedIntent, ServiceError> {
    let api_key = settings
        .api_key
        .as_deref()
        .ok_or_else(|| ServiceError::ConfigError("LLM API key not configured".to_string()))?;

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let url = format!("{}/chat/completions", settings.api_base.trim_end_matches('/'));
    debug!("POST {} (intent extraction)", url);

    let body = json!({
        "model": settings.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt },
        ],
        "temperature": 0.0,
        "max_tokens": 300,
    });

    let response = client.post(&url).bearer_auth(api_key).json(&body).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(ServiceError::ExtractionError(format!("{}: {}", status, text)));
    }

    let completion: ChatCompletion = response.json().await?;
    let content = completion
        .choices
        .first()
        .map(|c| c.message.content.as_str())
        .ok_or_else(|| ServiceError::ExtractionError("empty completion".to_string()))?;

    let raw: RawIntent = serde_json::from_str(strip_code_fences(content))?;

    Ok(ExtractedIntent {
        repo_url: raw.repo_url.filter(|s| !s.trim().is_empty()),
        // An unrecognized environment string is treated as absent rather
        // than guessed at
        environment: raw.environment.and_then(|s| s.parse().ok()),
        deployment_kind: raw
            .deployment_type
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "web application".to_string()),
        requirements: raw.requirements.filter(|s| !s.trim().is_empty()),
    })
}

/// Models often wrap JSON replies in markdown code fences; strip them.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}
