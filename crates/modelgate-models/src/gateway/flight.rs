//! Flight ticket price regressor

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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRequest {
    #[serde(rename = "Airline")]
    pub airline: String,

    #[serde(rename = "Source")]
    pub source: String,

    #[serde(rename = "Destination")]
    pub destination: String,

    #[serde(rename = "Total_Stops")]
    pub total_stops: i64,

    #[serde(rename = "Month")]
    pub month: i64,

    #[serde(rename = "Year")]
    pub year: i64,

    #[serde(rename = "Duration_hours")]
    pub duration_hours: i64,

    #[serde(rename = "Duration_min")]
    pub duration_min: i64,
}

impl FlightRequest {
    pub fn validate(&self) -> Result<()> {
        Violations::default()
            .at_least("Total_Stops", self.total_stops, 0)
            .between("Month", self.month, 1, 12)
            .at_least("Duration_hours", self.duration_hours, 0)
            .between("Duration_min", self.duration_min, 0, 59)
            .finish()
    }
}

impl FeatureSource for FlightRequest {
    fn feature(&self, column: &str) -> Option<FeatureValue> {
        let value: FeatureValue = match column {
            "Airline" => self.airline.as_str().into(),
            "Source" => self.source.as_str().into(),
            "Destination" => self.destination.as_str().into(),
            "Total_Stops" => self.total_stops.into(),
            "Month" => self.month.into(),
            "Year" => self.year.into(),
            "Duration_hours" => self.duration_hours.into(),
            "Duration_min" => self.duration_min.into(),
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightResponse {
    pub predicted_price: f64,
}

pub struct FlightGateway {
    store: Arc<ArtifactStore<TabularArtifact>>,
}

impl FlightGateway {
    pub fn new(store: Arc<ArtifactStore<TabularArtifact>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ArtifactStore<TabularArtifact>> {
        &self.store
    }

    pub fn infer(artifact: &TabularArtifact, request: &FlightRequest) -> Result<FlightResponse> {
        let row = frame(request, artifact.features())?;
        let predicted_price = artifact.regress(&row)?;
        debug!(airline = %request.airline, predicted_price, "Flight price prediction");
        Ok(FlightResponse { predicted_price })
    }
}

#[async_trait]
impl Gateway for FlightGateway {
    type Request = FlightRequest;
    type Response = FlightResponse;

    async fn predict(&self, request: FlightRequest) -> Result<FlightResponse> {
        request.validate()?;
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            let artifact = store.get()?;
            Self::infer(&artifact, &request)
        })
        .await
    }

    fn domain(&self) -> Domain {
        Domain::Flight
    }
}
