//! Prompt intent extraction
//!
//! Two-stage strategy: an LLM-backed extractor is tried first and any
//! failure falls through to deterministic pattern matching, so extraction
//! never errors on unparseable input.

pub mod llm;
pub mod pattern;

use tracing::warn;

use crate::models::deployment::ExtractedIntent;
use crate::settings::LlmSettings;

/// Extract deployment intent from a free-text prompt
pub async fn extract_intent(prompt: &str, settings: &LlmSettings) -> ExtractedIntent {
    match llm::extract(prompt, settings).await {
        Ok(intent) => intent,
        Err(e) => {
            warn!("LLM extraction failed, falling back to pattern matching: {}", e);
            pattern::extract(prompt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deployment::Environment;

    #[tokio::test]
    async fn test_falls_back_to_pattern_matching_without_api_key() {
        let settings = LlmSettings::default();
        assert!(settings.api_key.is_none());

        let intent =
            extract_intent("deploy https://github.com/owner/repo to prod", &settings).await;
        assert_eq!(
            intent.repo_url.as_deref(),
            Some("https://github.com/owner/repo")
        );
        assert_eq!(intent.environment, Some(Environment::Prod));
    }

    #[tokio::test]
    async fn test_fallback_never_errors_on_garbage() {
        let settings = LlmSettings::default();
        let intent = extract_intent("%%% ???", &settings).await;
        assert!(intent.needs_repository());
        assert!(intent.needs_environment());
    }
}
