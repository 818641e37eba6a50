//! Deterministic pattern-matching extractor
//!
//! The unconditional fallback behind the LLM extractor: a repository URL
//! scan plus environment keyword groups. First match wins; no environment
//! is ever assumed.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::deployment::{Environment, ExtractedIntent};

fn repo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https://github\.com/\S+").expect("valid repo regex"))
}

fn environment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(prod|production|live|beta|staging|qa|test|testing|dev|development|local)\b")
            .expect("valid environment regex")
    })
}

/// Extract intent from a prompt using pattern matching only
pub fn extract(prompt: &str) -> ExtractedIntent {
    ExtractedIntent {
        repo_url: find_repo_url(prompt),
        environment: find_environment(prompt),
        deployment_kind: "web application".to_string(),
        requirements: None,
    }
}

/// First GitHub URL in the prompt, with trailing punctuation trimmed
pub fn find_repo_url(prompt: &str) -> Option<String> {
    repo_regex()
        .find(prompt)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', '!', '?']).to_string())
}

/// First environment keyword in the prompt.
///
/// Keyword groups: `prod|production|live`, `beta|staging`, `qa|test|testing`,
/// `dev|development|local`. The earliest keyword in the text wins.
pub fn find_environment(prompt: &str) -> Option<Environment> {
    let lowered = prompt.to_lowercase();
    let keyword = environment_regex().find(&lowered)?;
    match keyword.as_str() {
        "prod" | "production" | "live" => Some(Environment::Prod),
        "beta" | "staging" => Some(Environment::Beta),
        "qa" | "test" | "testing" => Some(Environment::Qa),
        "dev" | "development" | "local" => Some(Environment::Dev),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_repo_url() {
        let intent = extract("please deploy https://github.com/owner/repo for me");
        assert_eq!(
            intent.repo_url.as_deref(),
            Some("https://github.com/owner/repo")
        );
    }

    #[test]
    fn test_trims_trailing_punctuation() {
        assert_eq!(
            find_repo_url("deploy https://github.com/owner/repo, thanks").as_deref(),
            Some("https://github.com/owner/repo")
        );
    }

    #[test]
    fn test_no_repo_means_none() {
        let intent = extract("deploy my app to prod");
        assert!(intent.needs_repository());
    }

    #[test]
    fn test_environment_keyword_groups() {
        assert_eq!(find_environment("push this live"), Some(Environment::Prod));
        assert_eq!(find_environment("to production please"), Some(Environment::Prod));
        assert_eq!(find_environment("to staging"), Some(Environment::Beta));
        assert_eq!(find_environment("run in testing"), Some(Environment::Qa));
        assert_eq!(find_environment("local development"), Some(Environment::Dev));
    }

    #[test]
    fn test_first_environment_keyword_wins() {
        assert_eq!(
            find_environment("promote from staging to prod"),
            Some(Environment::Beta)
        );
    }

    #[test]
    fn test_no_environment_is_never_defaulted() {
        assert_eq!(find_environment("deploy my app"), None);
        // Substrings inside larger words do not count
        assert_eq!(find_environment("my devops dashboard"), None);
    }
}
