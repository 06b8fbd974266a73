//! Server configuration
//!
//! Layered as: built-in defaults, then the YAML file, then
//! `MODELGATE__SECTION__KEY` environment variables, then CLI flags.

use modelgate_models::{LoadMode, ModelsConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MODELGATE";

/// Full gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: HttpConfig,

    #[serde(default)]
    pub models: ModelsConfig,
}

/// Listener and HTTP middleware settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, sized for image uploads
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    #[serde(default)]
    pub cors: CorsConfig,
}

/// Cross-origin settings for browser clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Accept any origin
    #[serde(default)]
    pub allow_any_origin: bool,

    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub models_dir: Option<PathBuf>,
    pub load_mode: Option<LoadMode>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_any_origin: false,
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment, then apply CLI overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(config_path: &Path, overrides: &Overrides) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(config_path)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: GatewayConfig = settings.try_deserialize()?;
        config.apply(overrides);
        Ok(config)
    }

    /// Parse a YAML document on its own
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(dir) = &overrides.models_dir {
            self.models.dir = dir.clone();
        }
        if let Some(mode) = overrides.load_mode {
            self.models.load_mode = mode;
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
