//! modelgate Core
//!
//! Types shared by every modelgate component.
//!
//! This crate provides:
//! - The error taxonomy surfaced by artifact loading, framing and inference
//! - Typed feature values and the single-row Feature Frame handed to models

pub mod error;
pub mod types;

pub use error::{Error, FieldError, Result};
pub use types::{FeatureFrame, FeatureValue};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, FieldError, Result};
    pub use crate::types::{FeatureFrame, FeatureValue};
}
