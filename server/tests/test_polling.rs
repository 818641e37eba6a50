//! Deploy status polling tests

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::MockPlatform;
use infragent::errors::ServiceError;
use infragent::models::deployment::{BuildLogLevel, DeploymentStatus, Environment};
use infragent::platform::driver::{wait_for_live, MAX_POLL_ATTEMPTS};
use infragent::platform::DeployStatus;
use infragent::registry::DeploymentRegistry;

fn instant_sleep(_d: Duration) -> impl std::future::Future<Output = ()> {
    async {}
}

fn registry_with_record() -> (DeploymentRegistry, String) {
    let registry = DeploymentRegistry::new();
    let id = registry.create(
        "https://github.com/owner/repo",
        Environment::Dev,
        "deploy it",
        None,
    );
    registry
        .update_status(&id, DeploymentStatus::InProgress, None)
        .unwrap();
    (registry, id)
}

fn count_step(registry: &DeploymentRegistry, id: &str, step: &str) -> usize {
    registry
        .get(id)
        .unwrap()
        .build_logs
        .iter()
        .filter(|entry| entry.step == step)
        .count()
}

#[tokio::test]
async fn test_live_resolves_service_url() {
    let mock = MockPlatform::with_statuses(vec![
        DeployStatus::Building,
        DeployStatus::Building,
        DeployStatus::Deploying,
        DeployStatus::Live,
    ]);
    let (registry, id) = registry_with_record();

    let url = wait_for_live(&mock, &registry, &id, "srv-1", "dep-1", instant_sleep)
        .await
        .unwrap();

    assert_eq!(url, "https://app.example.onrender.com");
    assert_eq!(mock.status_calls.load(Ordering::SeqCst), 4);
    assert_eq!(mock.url_calls.load(Ordering::SeqCst), 1);

    // One log entry per intermediate poll, plus the completion entry
    assert_eq!(count_step(&registry, &id, "building"), 2);
    assert_eq!(count_step(&registry, &id, "deploying"), 1);
    assert_eq!(count_step(&registry, &id, "completed"), 1);

    // Status reflects the last observed phase; the caller stamps terminal
    assert_eq!(
        registry.get(&id).unwrap().status,
        DeploymentStatus::Deploying
    );
}

#[tokio::test]
async fn test_remote_failure_is_immediate() {
    let mock = MockPlatform::with_statuses(vec![DeployStatus::Failed]);
    let (registry, id) = registry_with_record();

    let err = wait_for_live(&mock, &registry, &id, "srv-1", "dep-1", instant_sleep)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::PlatformError(_)));
    assert_eq!(mock.status_calls.load(Ordering::SeqCst), 1);
    assert_eq!(mock.url_calls.load(Ordering::SeqCst), 0);
    assert_eq!(count_step(&registry, &id, "failed"), 1);

    let logs = registry.get(&id).unwrap().build_logs;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, BuildLogLevel::Error);
}

#[tokio::test]
async fn test_canceled_is_a_hard_failure() {
    let mock = MockPlatform::with_statuses(vec![
        DeployStatus::Building,
        DeployStatus::Canceled,
    ]);
    let (registry, id) = registry_with_record();

    let err = wait_for_live(&mock, &registry, &id, "srv-1", "dep-1", instant_sleep)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::PlatformError(_)));
    assert_eq!(mock.status_calls.load(Ordering::SeqCst), 2);
    assert_eq!(count_step(&registry, &id, "failed"), 1);
}

#[tokio::test]
async fn test_exhausted_attempts_time_out() {
    // The platform reports `building` on every poll
    let mock = MockPlatform::with_statuses(vec![DeployStatus::Building]);
    let (registry, id) = registry_with_record();

    let err = wait_for_live(&mock, &registry, &id, "srv-1", "dep-1", instant_sleep)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::TimeoutError(_)));
    assert_eq!(
        mock.status_calls.load(Ordering::SeqCst),
        MAX_POLL_ATTEMPTS as usize
    );
    assert_eq!(count_step(&registry, &id, "building"), MAX_POLL_ATTEMPTS as usize);
    assert_eq!(count_step(&registry, &id, "failed"), 1);

    let record = registry.get(&id).unwrap();
    assert_eq!(record.status, DeploymentStatus::Building);
    assert_eq!(
        record.build_logs.last().unwrap().message,
        "Deployment timed out"
    );
}

#[tokio::test]
async fn test_unstarted_statuses_poll_silently() {
    let mock = MockPlatform::with_statuses(vec![
        DeployStatus::Created,
        DeployStatus::Building,
        DeployStatus::Live,
    ]);
    let (registry, id) = registry_with_record();

    wait_for_live(&mock, &registry, &id, "srv-1", "dep-1", instant_sleep)
        .await
        .unwrap();

    assert_eq!(mock.status_calls.load(Ordering::SeqCst), 3);
    let logs = registry.get(&id).unwrap().build_logs;
    assert_eq!(logs.len(), 2);
    assert_eq!(count_step(&registry, &id, "building"), 1);
    assert_eq!(count_step(&registry, &id, "completed"), 1);
}
