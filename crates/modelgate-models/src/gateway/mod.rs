//! Domain gateways: framing, inference and response translation per domain

pub mod animal;
pub mod depression;
pub mod flight;
pub mod recommend;

use crate::registry::Domain;
use async_trait::async_trait;
use modelgate_core::{Error, FieldError, Result};
use serde::Serialize;

pub use animal::{AnimalGateway, AnimalResponse};
pub use depression::{DepressionGateway, DepressionRequest, DepressionResponse};
pub use flight::{FlightGateway, FlightRequest, FlightResponse};
pub use recommend::{RecommendGateway, SearchRequest};

/// One prediction domain behind a uniform request/response contract
#[async_trait]
pub trait Gateway: Send + Sync {
    type Request: Send + 'static;
    type Response: Serialize + Send;

    /// Validate, frame, invoke and translate a single request
    async fn predict(&self, request: Self::Request) -> Result<Self::Response>;

    /// Domain served by this gateway
    fn domain(&self) -> Domain;
}

/// Run CPU-bound work off the async executor
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::internal(format!("inference task failed: {}", e)))?
}

/// Collects field-level validation failures
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<FieldError>);

impl Violations {
    pub fn at_least(&mut self, field: &str, value: i64, min: i64) -> &mut Self {
        if value < min {
            self.0.push(FieldError::out_of_range(
                field,
                format!("Input should be greater than or equal to {}", min),
            ));
        }
        self
    }

    pub fn at_most(&mut self, field: &str, value: i64, max: i64) -> &mut Self {
        if value > max {
            self.0.push(FieldError::out_of_range(
                field,
                format!("Input should be less than or equal to {}", max),
            ));
        }
        self
    }

    pub fn between(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        self.at_least(field, value, min).at_most(field, value, max)
    }

    pub fn push(&mut self, error: FieldError) -> &mut Self {
        self.0.push(error);
        self
    }

    pub fn finish(&mut self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(std::mem::take(&mut self.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violations_collect_every_field() {
        let err = Violations::default()
            .between("Age", 5, 10, 100)
            .between("Month", 13, 1, 12)
            .at_least("Total_Stops", 0, 0)
            .finish()
            .unwrap_err();

        match err {
            Error::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["Age", "Month"]);
                assert_eq!(fields[0].kind, "out_of_range");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_errors() {
        let out: Result<()> = run_blocking(|| Err(Error::inference("boom"))).await;
        assert!(matches!(out, Err(Error::Inference(_))));
        assert_eq!(run_blocking(|| Ok(7)).await.unwrap(), 7);
    }
}
