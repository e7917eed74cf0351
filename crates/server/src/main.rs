use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grabber_core::{
    load_config, load_config_from_env, validate_config, Config, ConfigError, ExecutionPipeline,
    FetchTool, JobQueue, PendingRequestStore, PreferenceStore, ResourceGate, SqliteJobQueue,
    SqliteKvStore, SysfsThermalMonitor, SystemMemoryProbe, ThermalProbe, WorkerPool, YtDlp,
};

use grabber_server::api::create_router;
use grabber_server::state::AppState;
use grabber_server::sweeper::spawn_sweeper;
use grabber_server::telegram::TelegramTransport;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = VERSION, "Starting grabber");

    let config = load_configuration()?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Staging directory: {:?}", config.fetcher.staging_dir);

    // Queue and key/value stores share one database file
    let queue = Arc::new(
        SqliteJobQueue::new(&config.database.path).context("Failed to open job queue")?,
    );
    let kv = Arc::new(
        SqliteKvStore::new(&config.database.path).context("Failed to open key/value store")?,
    );
    match queue.status() {
        Ok(depth) => info!(depth, "Job queue opened"),
        Err(e) => warn!(error = %e, "Could not read queue depth"),
    }

    let pending = PendingRequestStore::new(Arc::clone(&kv)).with_ttl(config.stores.pending_ttl());
    let preferences =
        PreferenceStore::new(Arc::clone(&kv)).with_ttl(config.stores.preference_ttl());

    // Fetch tool: problems are reported but do not stop startup
    let fetcher = Arc::new(YtDlp::new(config.fetcher.clone()));
    match fetcher.validate().await {
        Ok(()) => info!(binary = ?config.fetcher.binary, "Fetch tool available"),
        Err(e) => warn!(error = %e, "Fetch tool validation failed, jobs will fail until fixed"),
    }

    let transport = Arc::new(
        TelegramTransport::new(&config.telegram).context("Failed to create HTTP client")?,
    );
    info!(api_url = %config.telegram.api_base(), "Telegram transport initialized");

    // Resource gate, with the thermal monitor only when enabled
    let background = CancellationToken::new();
    let mut gate = ResourceGate::new(
        Arc::new(SystemMemoryProbe),
        config.resources.min_free_memory_bytes(),
    );
    let thermal_handle = if config.resources.thermal.enabled {
        let thermal = &config.resources.thermal;
        let monitor = Arc::new(SysfsThermalMonitor::new(
            &thermal.zone_path,
            thermal.threshold_millidegrees,
            thermal.sample_interval(),
        ));
        gate = gate.with_thermal_probe(Arc::clone(&monitor) as Arc<dyn ThermalProbe>);
        Some(monitor.spawn(background.clone()))
    } else {
        info!("Thermal monitoring disabled");
        None
    };

    let pipeline = ExecutionPipeline::new(fetcher, transport.clone(), config.fetcher.clone());
    let pool = Arc::new(WorkerPool::new(
        config.workers.clone(),
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        Arc::new(gate),
        Arc::new(pipeline),
        transport,
    ));
    pool.start().await;

    let sweeper_handle = spawn_sweeper(
        Arc::clone(&kv),
        config.stores.sweep_interval(),
        background.clone(),
    );

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        queue,
        Arc::clone(&pool),
        pending,
        preferences,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    pool.shutdown().await;

    background.cancel();
    if let Some(handle) = thermal_handle {
        let _ = handle.await;
    }
    let _ = sweeper_handle.await;

    info!("Shutdown complete");
    Ok(())
}

/// Load from the file named by `GRABBER_CONFIG` (default `config.toml`). Without a
/// file, fall back to environment variables alone.
fn load_configuration() -> Result<Config> {
    let config_path = std::env::var("GRABBER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    match load_config(&config_path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(path)) => {
            warn!(path = %path, "Config file not found, using environment only");
            load_config_from_env().context("Failed to load config from environment")
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to load config from {:?}", config_path))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
