//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Deployment lifecycle status
///
/// Transitions only move forward: `pending -> in_progress -> building ->
/// deploying -> completed`, with `failed` and `cancelled` reachable from any
/// non-terminal state. Terminal records never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Record created, nothing started yet
    Pending,

    /// Orchestration started
    InProgress,

    /// Remote build running
    Building,

    /// Remote deploy running
    Deploying,

    /// Live on the platform
    Completed,

    /// Aborted with an error
    Failed,

    /// Cancelled by external request
    Cancelled,
}

impl DeploymentStatus {
    /// Whether this status ends the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Completed | DeploymentStatus::Failed | DeploymentStatus::Cancelled
        )
    }

    /// Whether a record may advance from `self` to `next`
    pub fn can_advance_to(&self, next: DeploymentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.is_terminal() || next.rank() > self.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            DeploymentStatus::Pending => 0,
            DeploymentStatus::InProgress => 1,
            DeploymentStatus::Building => 2,
            DeploymentStatus::Deploying => 3,
            // Terminal states are ordered by is_terminal, not rank
            DeploymentStatus::Completed
            | DeploymentStatus::Failed
            | DeploymentStatus::Cancelled => 4,
        }
    }
}

/// Target environment for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Qa,
    Beta,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Beta => "beta",
            Environment::Prod => "prod",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "qa" => Ok(Environment::Qa),
            "beta" => Ok(Environment::Beta),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a build log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildLogLevel {
    Info,
    Warning,
    Error,
}

/// One entry in a record's append-only build log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildLogEntry {
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,

    /// Severity
    pub level: BuildLogLevel,

    /// Log message
    pub message: String,

    /// Orchestration step the entry belongs to
    pub step: String,
}

impl BuildLogEntry {
    pub fn new(level: BuildLogLevel, message: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            step: step.into(),
        }
    }
}

/// One tracked deployment attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Unique deployment ID, immutable
    pub id: String,

    /// Source repository URL, set once at creation
    pub repo_url: String,

    /// Target environment, set once at creation
    pub environment: Environment,

    /// Raw user prompt that produced this record, retained for audit
    pub prompt: String,

    /// Free-form deployment kind, refined after extraction
    pub deployment_kind: Option<String>,

    /// Free-form requirements, refined after extraction
    pub requirements: Option<String>,

    /// Current lifecycle status
    pub status: DeploymentStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Refreshed on every mutation
    pub updated_at: DateTime<Utc>,

    /// Set exactly once, on entering a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Set when the status becomes `failed`
    pub error_message: Option<String>,

    /// Local checkout directory
    pub deployment_dir: Option<String>,

    /// Live service URL, populated once the platform assigns it
    pub deployment_url: Option<String>,

    /// Remote service identifier; required for push-event re-triggers
    pub platform_service_id: Option<String>,

    /// True once source-control webhook registration succeeded
    pub webhook_configured: bool,

    /// Append-only progress log, never reordered or truncated
    pub build_logs: Vec<BuildLogEntry>,
}

/// Structured result of prompt intent extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedIntent {
    /// Repository URL, when one was recognized
    pub repo_url: Option<String>,

    /// Target environment, when one was recognized
    pub environment: Option<Environment>,

    /// Best-effort description of what is being deployed
    pub deployment_kind: String,

    /// Additional requirements mentioned in the prompt
    pub requirements: Option<String>,
}

impl ExtractedIntent {
    /// The prompt did not name a repository
    pub fn needs_repository(&self) -> bool {
        self.repo_url.is_none()
    }

    /// The prompt did not name a target environment
    pub fn needs_environment(&self) -> bool {
        self.environment.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_advances_forward() {
        assert!(DeploymentStatus::Pending.can_advance_to(DeploymentStatus::InProgress));
        assert!(DeploymentStatus::InProgress.can_advance_to(DeploymentStatus::Building));
        assert!(DeploymentStatus::Building.can_advance_to(DeploymentStatus::Deploying));
        assert!(DeploymentStatus::Deploying.can_advance_to(DeploymentStatus::Completed));
    }

    #[test]
    fn test_status_never_moves_backward() {
        assert!(!DeploymentStatus::Building.can_advance_to(DeploymentStatus::InProgress));
        assert!(!DeploymentStatus::Deploying.can_advance_to(DeploymentStatus::Building));
        assert!(!DeploymentStatus::InProgress.can_advance_to(DeploymentStatus::Pending));
        assert!(!DeploymentStatus::Building.can_advance_to(DeploymentStatus::Building));
    }

    #[test]
    fn test_failed_and_cancelled_reachable_from_any_transient_state() {
        for status in [
            DeploymentStatus::Pending,
            DeploymentStatus::InProgress,
            DeploymentStatus::Building,
            DeploymentStatus::Deploying,
        ] {
            assert!(status.can_advance_to(DeploymentStatus::Failed));
            assert!(status.can_advance_to(DeploymentStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_never_advance() {
        for status in [
            DeploymentStatus::Completed,
            DeploymentStatus::Failed,
            DeploymentStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_advance_to(DeploymentStatus::Pending));
            assert!(!status.can_advance_to(DeploymentStatus::Failed));
        }
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Prod));
        assert_eq!("QA".parse::<Environment>(), Ok(Environment::Qa));
        assert!("production".parse::<Environment>().is_err());
        assert!("".parse::<Environment>().is_err());
    }
}
