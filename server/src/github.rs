//! GitHub integration
//!
//! Repository URL validation, best-effort push-webhook registration, and
//! inbound webhook signature verification.

use hmac::{Hmac, Mac};
use reqwest::{header, Client, StatusCode};
use sha2::Sha256;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::ServiceError;
use crate::settings::GithubSettings;
use crate::utils::hex;

/// Validate that a repository reference is exactly
/// `https://github.com/<owner>/<name>` with an optional trailing slash.
pub fn validate_repo_url(repo_url: &str) -> bool {
    repo_parts(repo_url).is_some()
}

/// Extract `owner/name` from a repository URL
pub fn repo_full_name(repo_url: &str) -> Option<String> {
    repo_parts(repo_url).map(|(owner, name)| format!("{}/{}", owner, name))
}

fn repo_parts(repo_url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(repo_url).ok()?;
    if parsed.scheme() != "https" || parsed.host_str() != Some("github.com") {
        return None;
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    match segments.as_slice() {
        [owner, name] | [owner, name, ""] if !owner.is_empty() && !name.is_empty() => {
            Some((owner.to_string(), name.to_string()))
        }
        _ => None,
    }
}

/// Result of a best-effort webhook registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Hook created (HTTP 201)
    Created,

    /// Hook was already registered (HTTP 422 "already exists")
    AlreadyExists,

    /// Registration did not happen; never fatal for the deployment
    Failed(String),
}

/// GitHub REST client for webhook registration
pub struct GithubClient {
    client: Client,
    settings: GithubSettings,
}

impl GithubClient {
    /// Create a new GitHub client
    pub fn new(settings: GithubSettings) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client, settings })
    }

    /// Register a push webhook on a repository.
    ///
    /// Best-effort: every failure path is folded into `WebhookOutcome::Failed`
    /// so callers log it and continue.
    pub async fn register_push_webhook(&self, repo_url: &str) -> WebhookOutcome {
        let token = match &self.settings.token {
            Some(token) => token.clone(),
            None => {
                return WebhookOutcome::Failed(
                    "GitHub token not configured, skipping webhook setup".to_string(),
                )
            }
        };

        let full_name = match repo_full_name(repo_url) {
            Some(name) => name,
            None => return WebhookOutcome::Failed(format!("invalid repository URL: {}", repo_url)),
        };

        let api_url = format!(
            "{}/repos/{}/hooks",
            self.settings.api_base.trim_end_matches('/'),
            full_name
        );
        debug!("POST {} (webhook registration)", api_url);

        let body = serde_json::json!({
            "name": "web",
            "active": true,
            "events": ["push"],
            "config": {
                "url": self.settings.webhook_url,
                "content_type": "json",
                "secret": self.settings.webhook_secret,
                "insecure_ssl": "0",
            }
        });

        let response = self
            .client
            .post(&api_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::ACCEPT, "application/vnd.github.v3+json")
            .header(header::USER_AGENT, "infragent")
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                if status == StatusCode::CREATED {
                    info!("Webhook created for {}", full_name);
                    WebhookOutcome::Created
                } else if status == StatusCode::UNPROCESSABLE_ENTITY && text.contains("already exists")
                {
                    info!("Webhook already exists for {}", full_name);
                    WebhookOutcome::AlreadyExists
                } else {
                    warn!("Webhook registration failed: {} - {}", status, text);
                    WebhookOutcome::Failed(format!("{}: {}", status, text))
                }
            }
            Err(e) => {
                warn!("Webhook registration request failed: {}", e);
                WebhookOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Verify a `sha256=<hex>` HMAC signature over the raw request body.
///
/// Uses a constant-time comparison; a missing or malformed header fails.
pub fn verify_signature(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let hex_signature = match signature_header.strip_prefix("sha256=") {
        Some(s) => s,
        None => return false,
    };
    let signature = match hex::decode(hex_signature) {
        Some(bytes) => bytes,
        None => return false,
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Compute the `sha256=<hex>` signature for a payload
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, ServiceError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::Internal("HMAC init failed".to_string()))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_repo_url_accepts_owner_and_name() {
        assert!(validate_repo_url("https://github.com/owner/repo"));
        assert!(validate_repo_url("https://github.com/owner/repo/"));
    }

    #[test]
    fn test_validate_repo_url_rejects_other_shapes() {
        assert!(!validate_repo_url("not-a-url"));
        assert!(!validate_repo_url("https://github.com/onlyowner"));
        assert!(!validate_repo_url("https://github.com/owner/repo/extra"));
        assert!(!validate_repo_url("http://github.com/owner/repo"));
        assert!(!validate_repo_url("https://gitlab.com/owner/repo"));
        assert!(!validate_repo_url("https://github.com/owner/repo?ref=main"));
    }

    #[test]
    fn test_repo_full_name() {
        assert_eq!(
            repo_full_name("https://github.com/owner/repo/").as_deref(),
            Some("owner/repo")
        );
        assert_eq!(repo_full_name("https://github.com/onlyowner"), None);
    }

    #[test]
    fn test_signature_round_trip() {
        let secret = "supersecret";
        let body = br#"{"repository":{"full_name":"owner/repo"}}"#;
        let signature = sign_payload(secret, body).unwrap();
        assert!(verify_signature(secret, body, &signature));
    }

    #[test]
    fn test_signature_rejects_flipped_byte() {
        let secret = "supersecret";
        let body = b"payload";
        let signature = sign_payload(secret, body).unwrap();

        // Flip one nibble of the hex digest
        let mut tampered: Vec<char> = signature.chars().collect();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == '0' { '1' } else { '0' };
        let tampered: String = tampered.into_iter().collect();

        assert!(!verify_signature(secret, body, &tampered));
    }

    #[test]
    fn test_signature_rejects_missing_or_malformed_header() {
        assert!(!verify_signature("secret", b"payload", ""));
        assert!(!verify_signature("secret", b"payload", "sha256="));
        assert!(!verify_signature("secret", b"payload", "sha1=abcd"));
        assert!(!verify_signature("secret", b"payload", "sha256=zz"));
    }

    #[test]
    fn test_signature_rejects_wrong_secret() {
        let body = b"payload";
        let signature = sign_payload("secret-a", body).unwrap();
        assert!(!verify_signature("secret-b", body, &signature));
    }
}
