//! Image classification artifacts

pub mod cnn;
pub mod decode;

use crate::artifact::{read_bytes, read_json, Artifact, ArtifactMeta};
use crate::config::DeviceSpec;
use candle_core::{DType, Tensor};
use candle_nn::VarBuilder;
use image::RgbImage;
use modelgate_core::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use cnn::{CnnConfig, ConvBlockConfig, ImageCnn, Preprocess};
pub use decode::{check_content_type, decode_rgb, ImageUpload, ACCEPTED_CONTENT_TYPES};

/// Files making up an image artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    /// Architecture JSON
    pub config: PathBuf,
    /// SafeTensors weights
    pub weights: PathBuf,
    /// `{"class_names": [...]}` in output order
    pub labels: PathBuf,
    pub device: DeviceSpec,
}

#[derive(Debug, Deserialize)]
struct LabelFile {
    class_names: Vec<String>,
}

/// Loaded network plus the label list aligned with its output vector
pub struct ImageArtifact {
    config: CnnConfig,
    model: ImageCnn,
    class_names: Vec<String>,
}

impl ImageArtifact {
    /// Assemble from parts, enforcing label/output alignment
    pub fn new(config: CnnConfig, model: ImageCnn, class_names: Vec<String>) -> std::result::Result<Self, String> {
        config.validate()?;
        if class_names.len() != config.num_classes {
            return Err(format!(
                "model outputs {} classes but label file lists {}",
                config.num_classes,
                class_names.len()
            ));
        }
        Ok(Self {
            config,
            model,
            class_names,
        })
    }

    pub fn config(&self) -> &CnnConfig {
        &self.config
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn input_size(&self) -> u32 {
        self.config.input_size as u32
    }

    /// Decoded RGB image to a `[1, H, W, 3]` batch
    pub fn to_batch(&self, img: &RgbImage) -> Result<Tensor> {
        let (w, h) = img.dimensions();
        let data: Vec<f32> = img
            .as_raw()
            .iter()
            .map(|&px| self.config.preprocess.apply(px))
            .collect();

        Tensor::from_vec(data, (1, h as usize, w as usize, 3), self.model.device())
            .map_err(|e| Error::inference(format!("Failed to build input tensor: {}", e)))
    }

    /// Class probability vector, aligned with `class_names()`
    pub fn predict(&self, batch: &Tensor) -> Result<Vec<f32>> {
        let probs = self
            .model
            .forward(batch)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| Error::inference(format!("Model forward pass failed: {}", e)))?;

        if probs.len() != self.class_names.len() {
            return Err(Error::inference(format!(
                "model returned {} scores for {} classes",
                probs.len(),
                self.class_names.len()
            )));
        }
        Ok(probs)
    }
}

impl Artifact for ImageArtifact {
    type Source = ImageSource;

    fn load(source: &ImageSource) -> Result<Self> {
        let config: CnnConfig = read_json(&source.config)?;
        config
            .validate()
            .map_err(|reason| Error::corrupt(&source.config, reason))?;

        let labels: LabelFile = read_json(&source.labels)?;

        let weights = read_bytes(&source.weights)?;
        let device = source.device.create()?;

        let vb = VarBuilder::from_buffered_safetensors(weights, DType::F32, &device)
            .map_err(|e| Error::corrupt(&source.weights, format!("Failed to load weights: {}", e)))?;
        let model = ImageCnn::new(&config, vb)
            .map_err(|e| Error::corrupt(&source.weights, format!("Weights do not match architecture: {}", e)))?;

        Self::new(config, model, labels.class_names).map_err(|reason| Error::corrupt(&source.labels, reason))
    }

    fn primary_path(source: &ImageSource) -> &Path {
        &source.weights
    }

    fn meta(&self) -> ArtifactMeta {
        ArtifactMeta {
            version: self.config.version.clone(),
            labels: self.class_names.clone(),
            ..Default::default()
        }
    }
}
