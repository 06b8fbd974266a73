//! Application state shared across all requests

use crate::config::GatewayConfig;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use modelgate_models::ModelRegistry;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<GatewayConfig>,

    /// Gateways and their artifact stores
    pub registry: Arc<ModelRegistry>,

    /// Prometheus handle for `/metrics`, absent when no recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the registry. In eager mode this loads every artifact.
    pub fn new(config: GatewayConfig, metrics_handle: Option<PrometheusHandle>) -> Result<Self> {
        info!(
            dir = %config.models.dir.display(),
            load_mode = ?config.models.load_mode,
            "Loading model artifacts"
        );
        let registry = ModelRegistry::from_config(&config.models)?;

        let loaded = registry.artifacts().iter().filter(|a| a.loaded).count();
        info!(loaded, "Model registry ready");

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            metrics_handle,
        })
    }
}
