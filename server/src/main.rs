//! InfraAgent - Entry Point
//!
//! A deployment orchestrator that turns natural-language requests into
//! provisioned services on a remote deployment platform.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use infragent::logs::{init_logging, LogOptions};
use infragent::orchestrator::Orchestrator;
use infragent::platform::render::RenderClient;
use infragent::platform::PlatformApi;
use infragent::registry::DeploymentRegistry;
use infragent::server::serve::serve;
use infragent::server::state::ServerState;
use infragent::settings::Settings;
use infragent::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(s) => println!("{}", s),
            Err(e) => println!("Failed to serialize version info: {}", e),
        }
        return;
    }

    // Load settings from the environment
    let settings = Settings::from_env();

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    info!("Starting InfraAgent v{}", version.version);
    if settings.platform.api_key.is_none() {
        info!("Platform API key not configured; deployments will fail at provisioning");
    }
    if settings.github.token.is_none() {
        info!("GitHub token not configured; webhook registration will be skipped");
    }

    // Wire up the registry, platform client, and orchestrator
    let registry = Arc::new(DeploymentRegistry::new());
    let api: Arc<dyn PlatformApi> = match RenderClient::new(&settings.platform) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build platform client: {}", e);
            return;
        }
    };
    let orchestrator = match Orchestrator::new(registry.clone(), api, settings.clone()) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => {
            error!("Failed to build orchestrator: {}", e);
            return;
        }
    };

    let state = Arc::new(ServerState::new(
        registry,
        orchestrator,
        settings.github.webhook_secret.clone(),
    ));

    // Run the server
    let handle = match serve(&settings.server, state, await_shutdown_signal()).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return;
        }
    };

    match handle.await {
        Ok(Ok(())) => info!("Server stopped"),
        Ok(Err(e)) => error!("Server exited with error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGINT handler: {}", e);
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Ctrl+C received, shutting down...");
    }
}
