//! CLI for subswarm
//!
//! Subcommands:
//! - `server`: run the control API and keep the session pool alive
//! - `session`: run a single session against a broker (useful for smoke tests)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use subswarm::api::{AddRequest, ControlApi, http};
use subswarm::config::{DEFAULT_CONFIG_PATH, Settings, load_config_from};
use subswarm::registry::SessionRegistry;
use subswarm::report::spawn_reporter;
use subswarm::transport::WebSocketConnector;
use subswarm::utils::error::ServerError;
use subswarm::utils::logging;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "subswarm")]
enum Command {
    /// Start the control API
    Server {
        /// Configuration file, without or with extension
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
    /// Run one session until interrupted
    Session {
        /// Session id; the private channel is `#<id>`
        #[arg(long)]
        id: String,
        /// Broker URL (http, https, ws or wss)
        #[arg(long)]
        url: String,
        /// Cookie header authenticating the session
        #[arg(long)]
        cookie: String,
        /// Configuration file, without or with extension
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    let result = match cmd {
        Command::Server { config } => run_server(&config).await,
        Command::Session {
            id,
            url,
            cookie,
            config,
        } => run_session(&config, id, url, cookie).await,
    };

    if let Err(e) = result {
        logging::init("info");
        error!("subswarm failed: {}", e);
        std::process::exit(1);
    }
}

fn bootstrap(config_path: &str) -> Result<(Settings, SessionRegistry), ServerError> {
    let settings = load_config_from(config_path)?;
    logging::init_with_file(&settings.logging.level, settings.logging.file.as_deref().map(Path::new))?;
    info!(?settings, "Settings");

    let connector = WebSocketConnector::from_settings(&settings.broker);
    let registry = SessionRegistry::new(Arc::new(connector));
    Ok((settings, registry))
}

async fn run_server(config_path: &str) -> Result<(), ServerError> {
    let (settings, registry) = bootstrap(config_path)?;
    let control = ControlApi::new(registry.clone(), settings.broker.url.clone());
    let shutdown = CancellationToken::new();

    let reporter = spawn_reporter(
        registry.clone(),
        Duration::from_secs(settings.report.interval_secs),
        shutdown.clone(),
    );

    let server = tokio::spawn(http::serve(settings.http_addr(), control, shutdown.clone()));

    tokio::select! {
        served = server => {
            match served {
                Ok(Err(e)) => error!("HTTP server failed: {}", e),
                Ok(Ok(())) => error!("HTTP server exited unexpectedly."),
                Err(e) => error!("HTTP server task failed: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    shutdown.cancel();
    registry.remove_all();
    let _ = reporter.await;
    Ok(())
}

async fn run_session(
    config_path: &str,
    id: String,
    url: String,
    cookie: String,
) -> Result<(), ServerError> {
    let (_settings, registry) = bootstrap(config_path)?;
    let control = ControlApi::new(registry.clone(), url);
    let shutdown = CancellationToken::new();

    let request = AddRequest {
        id,
        cookie,
        ..AddRequest::default()
    };
    for outcome in control.add_sessions(&request, Vec::new())? {
        println!("{outcome}");
    }

    let reporter = spawn_reporter(registry.clone(), Duration::from_secs(5), shutdown.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    shutdown.cancel();
    registry.remove_all();
    let _ = reporter.await;
    Ok(())
}
