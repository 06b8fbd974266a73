//! modelgate Models
//!
//! Artifact loading and per-domain inference for modelgate.
//!
//! This crate provides:
//! - [`ArtifactStore`]: a shared, atomically swappable handle to a loaded model
//! - Feature framing from request objects onto an artifact's column layout
//! - Tabular pipelines (column transforms plus linear or forest estimators)
//! - A Candle CNN for image classification
//! - TF-IDF similarity search over a fixed catalog
//! - One [`Gateway`] per prediction domain, collected in [`ModelRegistry`]

pub mod artifact;
pub mod config;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod frame;
pub mod gateway;
pub mod registry;
pub mod search;
pub mod tabular;
pub mod vision;

pub use artifact::{Artifact, ArtifactInfo, ArtifactMeta, ArtifactStore, LoadMode};
pub use config::{AnimalPaths, DeviceSpec, ModelsConfig, SearchSettings};
pub use frame::{frame, FeatureSource};
pub use gateway::{
    AnimalGateway, AnimalResponse, DepressionGateway, DepressionRequest, DepressionResponse,
    FlightGateway, FlightRequest, FlightResponse, Gateway, RecommendGateway, SearchRequest,
};
pub use registry::{Domain, ModelRegistry, UnknownDomain};
pub use search::{CatalogRecord, SearchHit, SearchIndex};
pub use tabular::TabularArtifact;
pub use vision::{ImageArtifact, ImageSource, ImageUpload};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifact::{Artifact, ArtifactStore, LoadMode};
    pub use crate::gateway::Gateway;
    pub use crate::registry::{Domain, ModelRegistry};
    pub use modelgate_core::prelude::*;
}
