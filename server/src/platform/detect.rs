//! Application kind detection and build planning
//!
//! Marker files in the checked-out repository select a build/start command
//! template from a fixed lookup table. Detection priority is container
//! descriptor first, then language manifests, then the static fallback.

use std::path::Path;

use serde::Serialize;

use crate::models::deployment::Environment;

/// Application kind classified from repository marker files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    /// Dockerfile present
    Docker,

    /// package.json present
    Node,

    /// requirements.txt present
    Python,

    /// No recognized marker; served as static assets
    Static,
}

impl AppKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppKind::Docker => "docker",
            AppKind::Node => "node",
            AppKind::Python => "python",
            AppKind::Static => "static",
        }
    }
}

/// Classify a checked-out repository by its marker files
pub fn detect_app_kind(repo_path: &Path) -> AppKind {
    if repo_path.join("Dockerfile").exists() {
        return AppKind::Docker;
    }
    if repo_path.join("package.json").exists() {
        return AppKind::Node;
    }
    if repo_path.join("requirements.txt").exists() {
        return AppKind::Python;
    }
    AppKind::Static
}

/// Build/start command template for a remote service
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Platform runtime environment
    pub env: &'static str,

    /// Build command, empty when the runtime needs none
    pub build_command: &'static str,

    /// Start command, empty when the runtime needs none
    pub start_command: &'static str,

    /// Environment variables injected into the service
    pub env_vars: Vec<(String, String)>,
}

/// Deterministic lookup of the build plan for an app kind
pub fn build_plan(kind: AppKind, environment: Environment, repo_url: &str) -> BuildPlan {
    let repo_var = ("REPO_URL".to_string(), repo_url.to_string());
    match kind {
        AppKind::Node => BuildPlan {
            env: "node",
            build_command: "npm install",
            start_command: "npm start",
            env_vars: vec![
                ("NODE_ENV".to_string(), environment.as_str().to_string()),
                repo_var,
            ],
        },
        AppKind::Python => BuildPlan {
            env: "python",
            build_command: "pip install -r requirements.txt",
            start_command: "python app.py",
            env_vars: vec![
                ("PYTHON_VERSION".to_string(), "3.9".to_string()),
                ("ENVIRONMENT".to_string(), environment.as_str().to_string()),
                repo_var,
            ],
        },
        AppKind::Docker => BuildPlan {
            env: "docker",
            build_command: "",
            start_command: "",
            env_vars: vec![
                ("ENVIRONMENT".to_string(), environment.as_str().to_string()),
                repo_var,
            ],
        },
        AppKind::Static => BuildPlan {
            env: "static",
            build_command: "",
            start_command: "",
            env_vars: vec![
                ("ENVIRONMENT".to_string(), environment.as_str().to_string()),
                repo_var,
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_empty_repo_is_static() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_app_kind(dir.path()), AppKind::Static);
    }

    #[test]
    fn test_marker_files_classify() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "requirements.txt");
        assert_eq!(detect_app_kind(dir.path()), AppKind::Python);

        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "package.json");
        assert_eq!(detect_app_kind(dir.path()), AppKind::Node);
    }

    #[test]
    fn test_container_descriptor_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "package.json");
        touch(dir.path(), "requirements.txt");
        touch(dir.path(), "Dockerfile");
        assert_eq!(detect_app_kind(dir.path()), AppKind::Docker);
    }

    #[test]
    fn test_manifest_outranks_static() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "package.json");
        touch(dir.path(), "requirements.txt");
        assert_eq!(detect_app_kind(dir.path()), AppKind::Node);
    }

    #[test]
    fn test_build_plan_lookup() {
        let plan = build_plan(AppKind::Node, Environment::Prod, "https://github.com/o/r");
        assert_eq!(plan.env, "node");
        assert_eq!(plan.build_command, "npm install");
        assert!(plan
            .env_vars
            .contains(&("NODE_ENV".to_string(), "prod".to_string())));

        let plan = build_plan(AppKind::Docker, Environment::Dev, "https://github.com/o/r");
        assert_eq!(plan.env, "docker");
        assert!(plan.build_command.is_empty());
    }
}
