//! Error types for modelgate

use serde::Serialize;
use std::path::PathBuf;

/// Result type alias using modelgate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Wire name of the offending field
    pub field: String,

    /// Human readable explanation
    pub message: String,

    /// Machine readable category (`missing`, `out_of_range`, `invalid`)
    pub kind: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Field value fell outside its declared bounds
    pub fn out_of_range(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(field, "out_of_range", message)
    }
}

/// Core error type for modelgate operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range request, rejected before any model work
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Upload with a content type outside the accepted image set
    #[error("unsupported media type: {0}")]
    UnsupportedMedia(String),

    /// Image bytes could not be decoded
    #[error("invalid image: {0}")]
    Decode(String),

    /// Artifact file is absent
    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Artifact file exists but cannot be used
    #[error("artifact corrupt ({}): {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// Request schema does not cover every column the artifact expects
    #[error("feature mapping incomplete, missing columns: {}", missing.join(", "))]
    IncompleteFeatureMapping { missing: Vec<String> },

    /// The model call itself failed
    #[error("inference error: {0}")]
    Inference(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error for a single field
    pub fn validation(field: FieldError) -> Self {
        Self::Validation(vec![field])
    }

    /// Create a new unsupported media error
    pub fn unsupported_media(content_type: impl Into<String>) -> Self {
        Self::UnsupportedMedia(content_type.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new corrupt-artifact error
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable name, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnsupportedMedia(_) => "unsupported_media",
            Self::Decode(_) => "decode",
            Self::ArtifactNotFound(_) => "artifact_not_found",
            Self::ArtifactCorrupt { .. } => "artifact_corrupt",
            Self::IncompleteFeatureMapping { .. } => "incomplete_feature_mapping",
            Self::Inference(_) => "inference",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }

    /// True when the caller sent something unusable
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnsupportedMedia(_) | Self::Decode(_)
        )
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = Error::Validation(vec![
            FieldError::out_of_range("Age", "must be between 10 and 100"),
            FieldError::new("Gender", "missing", "field required"),
        ]);

        let msg = err.to_string();
        assert!(msg.contains("Age: must be between 10 and 100"));
        assert!(msg.contains("Gender: field required"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(Error::decode("bad").kind(), "decode");
        assert_eq!(
            Error::IncompleteFeatureMapping { missing: vec!["Age".into()] }.kind(),
            "incomplete_feature_mapping"
        );
        assert!(!Error::inference("boom").is_client_error());
    }
}
