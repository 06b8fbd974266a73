//! Animal image classifier

use super::{run_blocking, Gateway};
use crate::artifact::ArtifactStore;
use crate::registry::Domain;
use crate::tabular::estimator::argmax;
use crate::vision::{check_content_type, decode_rgb, ImageArtifact, ImageUpload};
use async_trait::async_trait;
use modelgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalResponse {
    pub prediction: String,
    pub confidence: f64,
}

pub struct AnimalGateway {
    store: Arc<ArtifactStore<ImageArtifact>>,
}

impl AnimalGateway {
    pub fn new(store: Arc<ArtifactStore<ImageArtifact>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ArtifactStore<ImageArtifact>> {
        &self.store
    }

    /// Decode, classify and pick the most probable class
    pub fn infer(artifact: &ImageArtifact, bytes: &[u8]) -> Result<AnimalResponse> {
        let img = decode_rgb(bytes, artifact.input_size())?;
        let batch = artifact.to_batch(&img)?;
        let probs = artifact.predict(&batch)?;

        if probs.is_empty() {
            return Err(Error::inference("model returned no scores"));
        }
        let idx = argmax(&probs);

        Ok(AnimalResponse {
            prediction: artifact.class_names()[idx].clone(),
            confidence: f64::from(probs[idx]),
        })
    }
}

#[async_trait]
impl Gateway for AnimalGateway {
    type Request = ImageUpload;
    type Response = AnimalResponse;

    async fn predict(&self, upload: ImageUpload) -> Result<AnimalResponse> {
        check_content_type(upload.content_type.as_deref())?;
        debug!(
            filename = upload.filename.as_deref().unwrap_or("<unnamed>"),
            bytes = upload.bytes.len(),
            "Classifying image"
        );

        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let artifact = store.get()?;
            Self::infer(&artifact, &upload.bytes)
        })
        .await
    }

    fn domain(&self) -> Domain {
        Domain::Animal
    }
}
