//! Exquisite Entity Server
//!
//! Serves entity CRUD over HTTP from PostgreSQL, or from an in-process map
//! when running in debug mode or without a database configured.

mod config;
mod error;
mod handlers;
mod services;
mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, CONFIG_PATH_DEFAULT};
use services::{spawn_seeding, EntityService};
use storage::PgStore;

#[derive(Parser)]
#[command(name = "exquisite-server")]
#[command(author, version, about = "Entity store served over HTTP", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file
    #[arg(short, long, env = "EXQUISITE_CONFIG", default_value = CONFIG_PATH_DEFAULT)]
    config: PathBuf,

    /// Serve from memory, ignoring any database settings
    #[arg(long)]
    debug: bool,

    /// Override the configured HTTP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    #[command(name = "init-config")]
    InitConfig {
        /// Write a debug (in-memory) configuration
        #[arg(long)]
        debug: bool,

        /// Where to write it
        #[arg(long, default_value = CONFIG_PATH_DEFAULT)]
        path: PathBuf,
    },
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EntityService>,
}

/// Everything started by `App::start`, torn down by `App::shutdown`
struct App {
    state: AppState,
    pg: Option<Arc<PgStore>>,
    seeding: JoinHandle<()>,
}

impl App {
    async fn start(config: &Config) -> Result<Self> {
        let (service, pg) = match config.relational() {
            Some(pg_config) => {
                storage::db::create_database_if_missing(pg_config)
                    .await
                    .context("Failed to prepare database")?;
                let store = Arc::new(
                    PgStore::connect(pg_config)
                        .await
                        .context("Failed to connect to PostgreSQL")?,
                );
                (EntityService::new(store.clone()), Some(store))
            }
            None => (EntityService::fallback(), None),
        };

        let service = Arc::new(service);
        let seeding = spawn_seeding(service.clone(), config.initial_data());

        Ok(Self {
            state: AppState { service },
            pg,
            seeding,
        })
    }

    async fn shutdown(self) {
        if !self.seeding.is_finished() {
            warn!("Seeding still running at shutdown, aborting it");
            self.seeding.abort();
        }
        if let Some(pg) = self.pg {
            pg.close().await;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Some(Commands::InitConfig { debug, ref path }) => Config::default_for(debug).write(path),
        None => run_server(&cli).await,
    };

    if let Err(e) = result {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let default_filter = match verbose {
        0 => "info,tower_http=debug",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

async fn run_server(cli: &Cli) -> Result<()> {
    info!(
        "Starting Exquisite Entity Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("PID: {}", std::process::id());

    info!("Loading configuration from {}", cli.config.display());
    let mut config = Config::load(&cli.config).context("Failed to load configuration")?;
    if cli.debug {
        config.debug = true;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }

    let app = App::start(&config).await?;
    info!("Serving entities from {} store", app.state.service.backend());

    let router = build_router(app.state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Server listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    info!("Server stopped, releasing resources");
    app.shutdown().await;
    served
}

pub fn build_router(state: AppState) -> Router {
    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    let server_name = HeaderValue::from_str(&hostname)
        .unwrap_or_else(|_| HeaderValue::from_static("exquisite-server"));

    Router::new()
        .route("/", get(handlers::root))
        .route("/entities", get(handlers::entities::list))
        .route("/entity", post(handlers::entities::create))
        .route(
            "/entity/:id",
            get(handlers::entities::get)
                .put(handlers::entities::update)
                .delete(handlers::entities::delete),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            server_name,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Unable to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
