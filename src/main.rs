//! db-gateway
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http (axum + middleware) ──▶ handlers
//!                                             │
//!                                             ▼
//!                                   AccessorRegistry  (database, collection) → Accessor
//!                                             │             schema catalog ─┘
//!                                             ▼
//!                                  ConnectionRegistry  database → Connection
//!                                             │
//!                                             ▼
//!                                   Connector (mongodb | memory)
//! ```
//!
//! Exit codes: 0 clean shutdown, 1 startup failure, 2 invalid configuration.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use db_gateway::config::loader::{self, ConfigError};
use db_gateway::config::schema::BackendKind;
use db_gateway::config::watcher::ConfigWatcher;
use db_gateway::lifecycle::{probe_default, signals, Gateway, Shutdown};
use db_gateway::observability::{logging, metrics};
use db_gateway::{GatewayConfig, HttpServer};

#[derive(Parser, Debug)]
#[command(name = "db-gateway", version, about = "HTTP gateway to lazily connected databases")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long, env = "DB_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Settings that win over the config file, on startup and on every reload.
#[derive(clap::Args, Debug, Clone)]
struct Overrides {
    /// Connection URI template with <PASSWORD> and <DATABASE> placeholders.
    #[arg(long, env = "DATABASE_URI")]
    database_uri: Option<String>,

    /// Credential substituted for <PASSWORD>.
    #[arg(long, env = "DATABASE_PASSWORD", hide_env_values = true)]
    database_password: Option<String>,

    /// Listener bind address.
    #[arg(long, env = "DB_GATEWAY_BIND")]
    bind: Option<String>,

    /// Storage backend (mongodb or memory).
    #[arg(long, env = "DB_GATEWAY_BACKEND")]
    backend: Option<BackendKind>,
}

impl Overrides {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(uri) = &self.database_uri {
            config.database.uri_template = uri.clone();
        }
        if let Some(password) = &self.database_password {
            config.database.password = Some(password.clone());
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(backend) = self.backend {
            config.database.backend = backend;
        }
    }
}

fn load(args: &Args) -> Result<GatewayConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => loader::parse_config(&std::fs::read_to_string(path)?)?,
        None => GatewayConfig::default(),
    };
    args.overrides.apply(&mut config);
    loader::check(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("db-gateway: invalid configuration: {}", e);
            return ExitCode::from(2);
        }
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "db-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = ?config.database.backend,
        default_database = %config.database.default_database,
        default_collection = %config.database.default_collection,
        max_connections = config.listener.max_connections,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let installed = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e: std::net::AddrParseError| e.to_string())
            .and_then(metrics::init_metrics);
        if let Err(e) = installed {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to start metrics endpoint"
            );
            return ExitCode::from(1);
        }
    }

    let gateway = Gateway::from_config(&config);
    if probe_default(&gateway, &config).await.is_err() {
        return ExitCode::from(1);
    }

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %config.listener.bind_address, error = %e, "Failed to bind");
            return ExitCode::from(1);
        }
    };

    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let overrides = args.overrides.clone();
            let (watcher, updates) = ConfigWatcher::new(path);
            let watcher = watcher.with_overrides(move |c| overrides.apply(c));
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    let drain = Duration::from_secs(config.timeouts.shutdown_secs);
    let server = HttpServer::new(config, gateway);
    let mut server_task = tokio::spawn(server.run(listener, config_updates, shutdown.subscribe()));

    tokio::select! {
        _ = signals::wait_for_termination() => {
            shutdown.trigger();
            match tokio::time::timeout(drain, &mut server_task).await {
                Ok(_) => tracing::info!("Shutdown complete"),
                Err(_) => tracing::warn!(drain_secs = drain.as_secs(), "Drain deadline passed, exiting"),
            }
            ExitCode::SUCCESS
        }
        result = &mut server_task => match result {
            Ok(Ok(())) => ExitCode::SUCCESS,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Server failed");
                ExitCode::from(1)
            }
            Err(e) => {
                tracing::error!(error = %e, "Server task panicked");
                ExitCode::from(1)
            }
        },
    }
}
