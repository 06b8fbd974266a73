//! modelgate Server
//!
//! HTTP surface for the modelgate prediction gateways: one endpoint per
//! domain, an artifact listing, explicit reloads, health and metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{CorsConfig, GatewayConfig, HttpConfig, Overrides};
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
