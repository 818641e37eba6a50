//! Shared test fixtures

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use infragent::errors::ServiceError;
use infragent::platform::{DeployStatus, PlatformApi, ServiceSpec};

/// Platform API double driven by a scripted status sequence.
///
/// Statuses are consumed front to back; the final status repeats forever,
/// so a single-element script models a platform stuck in that state.
pub struct MockPlatform {
    statuses: Mutex<VecDeque<DeployStatus>>,
    pub create_calls: AtomicUsize,
    pub trigger_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub url_calls: AtomicUsize,
    pub fail_trigger: bool,
    pub service_url: String,
}

impl MockPlatform {
    pub fn with_statuses(statuses: Vec<DeployStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            create_calls: AtomicUsize::new(0),
            trigger_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            url_calls: AtomicUsize::new(0),
            fail_trigger: false,
            service_url: "https://app.example.onrender.com".to_string(),
        }
    }

    pub fn failing_trigger() -> Self {
        let mut mock = Self::with_statuses(vec![]);
        mock.fail_trigger = true;
        mock
    }

    fn next_status(&self) -> DeployStatus {
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.len() {
            0 => DeployStatus::Unknown,
            1 => statuses[0],
            _ => statuses.pop_front().unwrap_or(DeployStatus::Unknown),
        }
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn create_service(&self, _spec: &ServiceSpec) -> Result<String, ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok("srv-mock".to_string())
    }

    async fn trigger_deploy(&self, _service_id: &str) -> Result<String, ServiceError> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_trigger {
            return Err(ServiceError::PlatformError(
                "trigger rejected by platform".to_string(),
            ));
        }
        Ok("dep-mock".to_string())
    }

    async fn get_deploy_status(
        &self,
        _service_id: &str,
        _deploy_id: &str,
    ) -> Result<DeployStatus, ServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_status())
    }

    async fn get_service_url(&self, _service_id: &str) -> Result<String, ServiceError> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.service_url.clone())
    }
}
