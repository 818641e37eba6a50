//! In-memory deployment registry
//!
//! The authoritative table of deployment records. Records live for the
//! process lifetime; there is no eviction. All mutations go through the
//! registry so per-record updates stay atomic with respect to concurrent
//! readers.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::errors::ServiceError;
use crate::github;
use crate::models::deployment::{
    BuildLogEntry, BuildLogLevel, DeploymentRecord, DeploymentStatus, Environment,
};
use crate::utils::generate_uuid;

/// Deployment record store
pub struct DeploymentRegistry {
    records: RwLock<HashMap<String, DeploymentRecord>>,
}

impl DeploymentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new record in `pending` state and return its id
    pub fn create(
        &self,
        repo_url: &str,
        environment: Environment,
        prompt: &str,
        deployment_dir: Option<String>,
    ) -> String {
        let id = generate_uuid();
        let now = Utc::now();

        let record = DeploymentRecord {
            id: id.clone(),
            repo_url: repo_url.to_string(),
            environment,
            prompt: prompt.to_string(),
            deployment_kind: None,
            requirements: None,
            status: DeploymentStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_message: None,
            deployment_dir,
            deployment_url: None,
            platform_service_id: None,
            webhook_configured: false,
            build_logs: Vec::new(),
        };

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(id.clone(), record);
        id
    }

    /// Get a record by id
    pub fn get(&self, deployment_id: &str) -> Option<DeploymentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(deployment_id).cloned()
    }

    /// All records, newest first, capped at `limit`
    pub fn list(&self, limit: usize) -> Vec<DeploymentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<DeploymentRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit);
        all
    }

    /// Records for a specific repository URL, newest first
    pub fn find_by_repo(&self, repo_url: &str) -> Vec<DeploymentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<DeploymentRecord> = records
            .values()
            .filter(|r| r.repo_url.trim_end_matches('/') == repo_url.trim_end_matches('/'))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }

    /// Records for a specific environment, newest first
    pub fn find_by_environment(&self, environment: Environment) -> Vec<DeploymentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        let mut matched: Vec<DeploymentRecord> = records
            .values()
            .filter(|r| r.environment == environment)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }

    /// Most recently created record for an `owner/name` repository,
    /// used by the inbound push webhook lookup
    pub fn latest_for_repo(&self, full_name: &str) -> Option<DeploymentRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .values()
            .filter(|r| github::repo_full_name(&r.repo_url).as_deref() == Some(full_name))
            .max_by_key(|r| r.created_at)
            .cloned()
    }

    /// Advance a record's status.
    ///
    /// Backward transitions and transitions out of a terminal status are
    /// rejected. `completed_at` is stamped exactly once, on entering a
    /// terminal status.
    pub fn update_status(
        &self,
        deployment_id: &str,
        status: DeploymentStatus,
        error_message: Option<String>,
    ) -> Result<(), ServiceError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(deployment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("deployment {}", deployment_id)))?;

        if !record.status.can_advance_to(status) {
            return Err(ServiceError::DeployError(format!(
                "invalid status transition: {:?} -> {:?}",
                record.status, status
            )));
        }

        record.status = status;
        record.updated_at = Utc::now();
        if status.is_terminal() && record.completed_at.is_none() {
            record.completed_at = Some(record.updated_at);
        }
        if let Some(message) = error_message {
            record.error_message = Some(message);
        }
        Ok(())
    }

    /// Record extraction details refined after creation
    pub fn set_extracted_details(
        &self,
        deployment_id: &str,
        deployment_kind: Option<String>,
        requirements: Option<String>,
    ) -> Result<(), ServiceError> {
        self.with_record(deployment_id, |record| {
            if deployment_kind.is_some() {
                record.deployment_kind = deployment_kind;
            }
            if requirements.is_some() {
                record.requirements = requirements;
            }
        })
    }

    /// Store the remote service id assigned by the platform
    pub fn set_service_id(&self, deployment_id: &str, service_id: &str) -> Result<(), ServiceError> {
        self.with_record(deployment_id, |record| {
            record.platform_service_id = Some(service_id.to_string());
        })
    }

    /// Store the live service URL
    pub fn set_deployment_url(&self, deployment_id: &str, url: &str) -> Result<(), ServiceError> {
        self.with_record(deployment_id, |record| {
            record.deployment_url = Some(url.to_string());
        })
    }

    /// Flag the source-control webhook as registered
    pub fn mark_webhook_configured(&self, deployment_id: &str) -> Result<(), ServiceError> {
        self.with_record(deployment_id, |record| {
            record.webhook_configured = true;
        })
    }

    /// Append a build log entry. Logs are append-only for the life of the
    /// record, including after it reaches a terminal status.
    pub fn add_build_log(
        &self,
        deployment_id: &str,
        level: BuildLogLevel,
        message: impl Into<String>,
        step: impl Into<String>,
    ) -> Result<(), ServiceError> {
        self.with_record(deployment_id, |record| {
            record.build_logs.push(BuildLogEntry::new(level, message, step));
        })
    }

    /// Number of records
    pub fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    /// Whether the registry holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_record(
        &self,
        deployment_id: &str,
        mutate: impl FnOnce(&mut DeploymentRecord),
    ) -> Result<(), ServiceError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let record = records
            .get_mut(deployment_id)
            .ok_or_else(|| ServiceError::NotFound(format!("deployment {}", deployment_id)))?;
        mutate(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for DeploymentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_record() -> (DeploymentRegistry, String) {
        let registry = DeploymentRegistry::new();
        let id = registry.create(
            "https://github.com/owner/repo",
            Environment::Dev,
            "deploy my app",
            None,
        );
        (registry, id)
    }

    #[test]
    fn test_create_starts_pending() {
        let (registry, id) = registry_with_record();
        let record = registry.get(&id).unwrap();
        assert_eq!(record.status, DeploymentStatus::Pending);
        assert!(record.completed_at.is_none());
        assert!(record.build_logs.is_empty());
        assert!(!record.webhook_configured);
    }

    #[test]
    fn test_status_is_monotone() {
        let (registry, id) = registry_with_record();
        registry
            .update_status(&id, DeploymentStatus::InProgress, None)
            .unwrap();
        registry
            .update_status(&id, DeploymentStatus::Building, None)
            .unwrap();

        // Backwards is rejected
        assert!(registry
            .update_status(&id, DeploymentStatus::InProgress, None)
            .is_err());
        assert_eq!(
            registry.get(&id).unwrap().status,
            DeploymentStatus::Building
        );
    }

    #[test]
    fn test_completed_at_set_exactly_once() {
        let (registry, id) = registry_with_record();
        registry
            .update_status(&id, DeploymentStatus::Failed, Some("boom".to_string()))
            .unwrap();

        let record = registry.get(&id).unwrap();
        let completed_at = record.completed_at.unwrap();
        assert_eq!(record.error_message.as_deref(), Some("boom"));

        // Terminal records never transition again, so completed_at is stable
        assert!(registry
            .update_status(&id, DeploymentStatus::Completed, None)
            .is_err());
        assert_eq!(registry.get(&id).unwrap().completed_at, Some(completed_at));
    }

    #[test]
    fn test_build_logs_append_only() {
        let (registry, id) = registry_with_record();
        registry
            .add_build_log(&id, BuildLogLevel::Info, "first", "initialization")
            .unwrap();
        registry
            .add_build_log(&id, BuildLogLevel::Error, "second", "failed")
            .unwrap();

        let logs = registry.get(&id).unwrap().build_logs;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "first");
        assert_eq!(logs[1].message, "second");

        // Still appendable after a terminal transition
        registry
            .update_status(&id, DeploymentStatus::Failed, None)
            .unwrap();
        registry
            .add_build_log(&id, BuildLogLevel::Info, "post-mortem", "redeploy")
            .unwrap();
        assert_eq!(registry.get(&id).unwrap().build_logs.len(), 3);
    }

    #[test]
    fn test_list_newest_first_with_limit() {
        let registry = DeploymentRegistry::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(registry.create(
                &format!("https://github.com/owner/repo{}", i),
                Environment::Qa,
                "prompt",
                None,
            ));
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let listed = registry.list(2);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, ids[2]);
        assert_eq!(listed[1].id, ids[1]);
    }

    #[test]
    fn test_latest_for_repo_breaks_ties_by_created_at() {
        let registry = DeploymentRegistry::new();
        let first = registry.create(
            "https://github.com/owner/repo",
            Environment::Dev,
            "prompt",
            None,
        );
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = registry.create(
            "https://github.com/owner/repo/",
            Environment::Prod,
            "prompt",
            None,
        );

        let latest = registry.latest_for_repo("owner/repo").unwrap();
        assert_eq!(latest.id, second);
        assert_ne!(latest.id, first);
        assert!(registry.latest_for_repo("owner/other").is_none());
    }

    #[test]
    fn test_filters() {
        let registry = DeploymentRegistry::new();
        registry.create(
            "https://github.com/owner/a",
            Environment::Dev,
            "prompt",
            None,
        );
        registry.create(
            "https://github.com/owner/a",
            Environment::Prod,
            "prompt",
            None,
        );
        registry.create(
            "https://github.com/owner/b",
            Environment::Prod,
            "prompt",
            None,
        );

        assert_eq!(registry.find_by_repo("https://github.com/owner/a").len(), 2);
        assert_eq!(registry.find_by_environment(Environment::Prod).len(), 2);
        assert_eq!(registry.find_by_environment(Environment::Qa).len(), 0);
    }
}
