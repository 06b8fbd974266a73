//! Tabular artifacts: preprocessing plus a fitted estimator

pub mod estimator;
pub mod preprocess;
pub mod tree;

use crate::artifact::{read_json, Artifact, ArtifactMeta};
use modelgate_core::{Error, FeatureFrame, FeatureValue, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use estimator::Estimator;
pub use preprocess::{ColumnTransform, ColumnTransformer, HandleUnknown, TransformStep};
pub use tree::DecisionTree;

/// Preprocessor and estimator fitted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularPipeline {
    #[serde(default)]
    pub preprocessor: ColumnTransformer,
    pub estimator: Estimator,
}

/// Serialized tabular model bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularArtifact {
    #[serde(default)]
    pub version: Option<String>,

    /// What the model predicts, for listings
    #[serde(default)]
    pub target: Option<String>,

    /// Ordered column names the pipeline was fitted on
    pub features: Vec<String>,

    /// Held-out evaluation metrics (`mae`, `r2`, `accuracy`, ...)
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,

    /// Training row count
    #[serde(default)]
    pub rows: Option<u64>,

    pub model: TabularPipeline,
}

/// Raw classifier output for one row
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrediction {
    /// Class chosen by the model's own decision rule
    pub class_index: usize,
    pub label: FeatureValue,
    /// Probability of the class at the requested column
    pub probability: f64,
    pub probabilities: Vec<f64>,
}

impl TabularArtifact {
    /// Check internal consistency; returns the encoded width
    pub fn validate(&self) -> std::result::Result<usize, String> {
        if self.features.is_empty() {
            return Err("artifact lists no features".to_string());
        }
        let width = self.model.preprocessor.validate(&self.features)?;
        self.model.estimator.validate(width)?;
        Ok(width)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn is_classifier(&self) -> bool {
        self.model.estimator.is_classifier()
    }

    fn encode(&self, frame: &FeatureFrame) -> Result<Vec<f64>> {
        if frame.columns() != self.features.as_slice() {
            return Err(Error::inference(format!(
                "frame columns {:?} do not match artifact features {:?}",
                frame.columns(),
                self.features
            )));
        }
        self.model.preprocessor.transform(frame)
    }

    /// Run a classifier. `positive_index` selects which probability
    /// column is reported.
    pub fn classify(&self, frame: &FeatureFrame, positive_index: usize) -> Result<ClassPrediction> {
        let x = self.encode(frame)?;
        let estimator = &self.model.estimator;

        let probabilities = estimator.predict_proba(&x)?;
        let probability = *probabilities.get(positive_index).ok_or_else(|| {
            Error::inference(format!(
                "probability column {} out of range for {} classes",
                positive_index,
                probabilities.len()
            ))
        })?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::inference(format!("probability {} outside [0, 1]", probability)));
        }

        let class_index = estimator.predict_class(&x)?;
        let label = estimator.classes()[class_index].clone();

        Ok(ClassPrediction {
            class_index,
            label,
            probability,
            probabilities,
        })
    }

    /// Run a regressor
    pub fn regress(&self, frame: &FeatureFrame) -> Result<f64> {
        let x = self.encode(frame)?;
        let value = self.model.estimator.predict_value(&x)?;
        if !value.is_finite() {
            return Err(Error::inference(format!("regressor produced non-finite value {}", value)));
        }
        Ok(value)
    }
}

impl Artifact for TabularArtifact {
    type Source = PathBuf;

    fn load(source: &PathBuf) -> Result<Self> {
        let artifact: TabularArtifact = read_json(source)?;
        artifact
            .validate()
            .map_err(|reason| Error::corrupt(source, reason))?;
        Ok(artifact)
    }

    fn primary_path(source: &PathBuf) -> &Path {
        source
    }

    fn meta(&self) -> ArtifactMeta {
        let mut metrics = self.metrics.clone();
        if let Some(rows) = self.rows {
            metrics.insert("rows".to_string(), rows as f64);
        }
        ArtifactMeta {
            version: self.version.clone(),
            features: self.features.clone(),
            labels: self
                .model
                .estimator
                .classes()
                .iter()
                .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
                .collect(),
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIFIER: &str = r#"{
        "version": "1.0.0",
        "features": ["Gender", "Age"],
        "metrics": {"accuracy": 0.84},
        "model": {
            "preprocessor": {"transformers": [
                {"name": "num", "columns": ["Age"]},
                {"name": "cat", "columns": ["Gender"], "steps": [
                    {"type": "one_hot_encoder", "categories": [["Female", "Male"]]}
                ]}
            ]},
            "estimator": {"type": "logistic_regression", "coef": [-0.1, 0.5, 1.5], "intercept": 1.0, "classes": [0, 1]}
        }
    }"#;

    fn frame(gender: &str, age: i64) -> FeatureFrame {
        let mut frame = FeatureFrame::with_capacity(2);
        frame.push("Gender", FeatureValue::from(gender));
        frame.push("Age", FeatureValue::Int(age));
        frame
    }

    #[test]
    fn test_classify() {
        let artifact: TabularArtifact = serde_json::from_str(CLASSIFIER).unwrap();
        assert_eq!(artifact.validate().unwrap(), 3);

        // z = -0.1 * 20 + 1.5 + 1.0 = 0.5
        let out = artifact.classify(&frame("Male", 20), 1).unwrap();
        assert_eq!(out.class_index, 1);
        assert_eq!(out.label, FeatureValue::Int(1));
        assert!((out.probability - 1.0 / (1.0 + (-0.5f64).exp())).abs() < 1e-12);

        // z = -0.1 * 60 + 0.5 + 1.0 = -4.5
        let out = artifact.classify(&frame("Female", 60), 1).unwrap();
        assert_eq!(out.class_index, 0);
        assert!(out.probability < 0.5);
    }

    #[test]
    fn test_regress_on_classifier_fails() {
        let artifact: TabularArtifact = serde_json::from_str(CLASSIFIER).unwrap();
        assert!(matches!(artifact.regress(&frame("Male", 20)), Err(Error::Inference(_))));
    }

    #[test]
    fn test_frame_out_of_order_is_rejected() {
        let artifact: TabularArtifact = serde_json::from_str(CLASSIFIER).unwrap();
        let mut frame = FeatureFrame::with_capacity(2);
        frame.push("Age", FeatureValue::Int(20));
        frame.push("Gender", FeatureValue::from("Male"));
        assert!(artifact.classify(&frame, 1).is_err());
    }

    #[test]
    fn test_load_rejects_inconsistent_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, CLASSIFIER.replace("[-0.1, 0.5, 1.5]", "[-0.1, 0.5]")).unwrap();

        let err = TabularArtifact::load(&path).unwrap_err();
        assert!(matches!(err, Error::ArtifactCorrupt { .. }));
        assert!(err.to_string().contains("2 coefficients"));
    }

    #[test]
    fn test_meta_includes_rows() {
        let mut artifact: TabularArtifact = serde_json::from_str(CLASSIFIER).unwrap();
        artifact.rows = Some(27901);
        let meta = artifact.meta();
        assert_eq!(meta.version.as_deref(), Some("1.0.0"));
        assert_eq!(meta.metrics.get("rows"), Some(&27901.0));
        assert_eq!(meta.features, vec!["Gender".to_string(), "Age".to_string()]);
        assert_eq!(meta.labels, vec!["0".to_string(), "1".to_string()]);
    }
}
