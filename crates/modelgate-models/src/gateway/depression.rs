//! Student depression risk classifier

use super::{run_blocking, Gateway, Violations};
use crate::artifact::ArtifactStore;
use crate::frame::{frame, FeatureSource};
use crate::registry::Domain;
use crate::tabular::TabularArtifact;
use async_trait::async_trait;
use modelgate_core::{FeatureValue, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Probability column reported as `probability_depression`
pub const POSITIVE_CLASS: usize = 1;

/// Survey answers for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepressionRequest {
    #[serde(rename = "Gender")]
    pub gender: String,

    #[serde(rename = "Age")]
    pub age: i64,

    #[serde(rename = "Academic_Pressure")]
    pub academic_pressure: i64,

    #[serde(rename = "Study_Satisfaction")]
    pub study_satisfaction: i64,

    #[serde(rename = "Sleep_Duration")]
    pub sleep_duration: String,

    #[serde(rename = "Dietary_Habits")]
    pub dietary_habits: String,

    #[serde(rename = "Suicidal_Thoughts", alias = "Have you ever had suicidal thoughts ?")]
    pub suicidal_thoughts: String,

    #[serde(rename = "Study_Hours")]
    pub study_hours: i64,

    #[serde(rename = "Financial_Stress")]
    pub financial_stress: i64,

    #[serde(rename = "Family_History", alias = "Family History of Mental Illness")]
    pub family_history: String,
}

impl DepressionRequest {
    pub fn validate(&self) -> Result<()> {
        Violations::default()
            .between("Age", self.age, 10, 100)
            .between("Academic_Pressure", self.academic_pressure, 0, 5)
            .between("Study_Satisfaction", self.study_satisfaction, 0, 5)
            .between("Study_Hours", self.study_hours, 0, 24)
            .between("Financial_Stress", self.financial_stress, 0, 5)
            .finish()
    }
}

impl FeatureSource for DepressionRequest {
    fn feature(&self, column: &str) -> Option<FeatureValue> {
        let value: FeatureValue = match column {
            "Gender" => self.gender.as_str().into(),
            "Age" => self.age.into(),
            "Academic Pressure" => self.academic_pressure.into(),
            "Study Satisfaction" => self.study_satisfaction.into(),
            "Sleep Duration" => self.sleep_duration.as_str().into(),
            "Dietary Habits" => self.dietary_habits.as_str().into(),
            "Have you ever had suicidal thoughts ?" => self.suicidal_thoughts.as_str().into(),
            "Study Hours" => self.study_hours.into(),
            "Financial Stress" => self.financial_stress.into(),
            "Family History of Mental Illness" => self.family_history.as_str().into(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepressionResponse {
    /// "Yes" or "No"
    pub prediction: String,
    pub probability_depression: f64,
}

pub struct DepressionGateway {
    store: Arc<ArtifactStore<TabularArtifact>>,
}

impl DepressionGateway {
    pub fn new(store: Arc<ArtifactStore<TabularArtifact>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ArtifactStore<TabularArtifact>> {
        &self.store
    }

    /// Synchronous framing, inference and translation
    pub fn infer(artifact: &TabularArtifact, request: &DepressionRequest) -> Result<DepressionResponse> {
        let row = frame(request, artifact.features())?;
        let out = artifact.classify(&row, POSITIVE_CLASS)?;

        // The label follows the model's own decision, not a fixed threshold
        let prediction = if out.class_index == POSITIVE_CLASS { "Yes" } else { "No" };
        debug!(label = %out.label, probability = out.probability, "Depression prediction");

        Ok(DepressionResponse {
            prediction: prediction.to_string(),
            probability_depression: out.probability,
        })
    }
}

#[async_trait]
impl Gateway for DepressionGateway {
    type Request = DepressionRequest;
    type Response = DepressionResponse;

    async fn predict(&self, request: DepressionRequest) -> Result<DepressionResponse> {
        request.validate()?;
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let artifact = store.get()?;
            Self::infer(&artifact, &request)
        })
        .await
    }

    fn domain(&self) -> Domain {
        Domain::Depression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::Error;

    fn request() -> DepressionRequest {
        serde_json::from_str(
            r#"{
                "Gender": "Male", "Age": 22, "Academic_Pressure": 4, "Study_Satisfaction": 2,
                "Sleep_Duration": "5-6 hours", "Dietary_Habits": "Unhealthy",
                "Suicidal_Thoughts": "Yes", "Study_Hours": 10, "Financial_Stress": 5,
                "Family_History": "Yes"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_aliases_accepted() {
        let aliased: DepressionRequest = serde_json::from_str(
            r#"{
                "Gender": "Male", "Age": 22, "Academic_Pressure": 4, "Study_Satisfaction": 2,
                "Sleep_Duration": "5-6 hours", "Dietary_Habits": "Unhealthy",
                "Have you ever had suicidal thoughts ?": "Yes", "Study_Hours": 10,
                "Financial_Stress": 5, "Family History of Mental Illness": "Yes"
            }"#,
        )
        .unwrap();
        assert_eq!(aliased, request());
    }

    #[test]
    fn test_validation_ranges() {
        assert!(request().validate().is_ok());

        let mut bad = request();
        bad.age = 9;
        bad.study_hours = 25;
        match bad.validate() {
            Err(Error::Validation(fields)) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].field, "Age");
                assert_eq!(fields[1].field, "Study_Hours");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_maps_dataset_columns() {
        let req = request();
        assert_eq!(req.feature("Academic Pressure"), Some(FeatureValue::Int(4)));
        assert_eq!(
            req.feature("Have you ever had suicidal thoughts ?"),
            Some(FeatureValue::from("Yes"))
        );
        assert_eq!(req.feature("Academic_Pressure"), None);
        assert_eq!(req.feature("CGPA"), None);
    }

    #[test]
    fn test_fractional_integer_rejected() {
        let json = serde_json::to_string(&request()).unwrap().replace("\"Age\":22", "\"Age\":22.5");
        assert!(serde_json::from_str::<DepressionRequest>(&json).is_err());
    }
}
