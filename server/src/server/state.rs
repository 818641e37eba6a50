//! Server state

use std::sync::Arc;

use crate::orchestrator::Orchestrator;
use crate::registry::DeploymentRegistry;

/// Server state shared across handlers
pub struct ServerState {
    pub registry: Arc<DeploymentRegistry>,
    pub orchestrator: Arc<Orchestrator>,
    pub webhook_secret: String,
}

impl ServerState {
    pub fn new(
        registry: Arc<DeploymentRegistry>,
        orchestrator: Arc<Orchestrator>,
        webhook_secret: String,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            webhook_secret,
        }
    }
}
