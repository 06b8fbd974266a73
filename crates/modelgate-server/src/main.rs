//! modelgate Server
//!
//! Serves depression risk, flight price, animal image and catalog search
//! predictions from artifacts in a models directory.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use modelgate_models::LoadMode;
use modelgate_server::{create_router, AppState, GatewayConfig, Overrides};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "modelgate-server")]
#[command(about = "modelgate prediction gateway", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "modelgate.yaml")]
    config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Directory holding the model artifacts
    #[arg(short, long, env = "MODELGATE_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Load artifacts on first request instead of at start-up
    #[arg(long)]
    lazy: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.listen.clone(),
            port: self.port,
            models_dir: self.models_dir.clone(),
            load_mode: self.lazy.then_some(LoadMode::Lazy),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting modelgate server");

    let config = GatewayConfig::load(&cli.config, &cli.overrides())?;
    info!(config = %cli.config.display(), "Configuration loaded");
    info!("Models directory: {}", config.models.dir.display());
    info!("Load mode: {:?}", config.models.load_mode);

    let metrics_handle = init_metrics()?;

    // Eager mode fails here if any artifact is missing or corrupt
    let addr: SocketAddr = config.listen_addr().parse()?;
    let state = AppState::new(config, Some(metrics_handle))?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("modelgate=debug,modelgate_models=debug,modelgate_server=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("modelgate_models=info,modelgate_server=info,modelgate=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "modelgate_requests_total",
        "Total number of prediction requests by domain"
    );
    metrics::describe_counter!(
        "modelgate_errors_total",
        "Total number of failed prediction requests by domain and error kind"
    );
    metrics::describe_histogram!(
        "modelgate_inference_latency_us",
        metrics::Unit::Microseconds,
        "Framing plus inference latency in microseconds by domain"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
