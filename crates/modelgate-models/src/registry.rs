//! All domain gateways and their artifact stores

use crate::artifact::{ArtifactInfo, ArtifactStore};
use crate::config::ModelsConfig;
use crate::gateway::{AnimalGateway, DepressionGateway, FlightGateway, RecommendGateway};
use modelgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Prediction domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Depression,
    Flight,
    Animal,
    Recommend,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Self::Depression, Self::Flight, Self::Animal, Self::Recommend];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Depression => "depression",
            Self::Flight => "flight",
            Self::Animal => "animal",
            Self::Recommend => "recommend",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised domain name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> std::result::Result<Self, UnknownDomain> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

/// Every gateway, each owning one artifact store
pub struct ModelRegistry {
    pub depression: DepressionGateway,
    pub flight: FlightGateway,
    pub animal: AnimalGateway,
    pub recommend: RecommendGateway,
}

impl ModelRegistry {
    /// Build every store. In eager mode any missing or corrupt artifact
    /// fails here.
    pub fn from_config(config: &ModelsConfig) -> Result<Self> {
        if config.search.max_top_k == 0 {
            return Err(Error::config("models.search.max_top_k must be positive"));
        }

        let mode = config.load_mode;
        info!(dir = %config.dir.display(), ?mode, "Initializing model registry");

        let depression = ArtifactStore::new(Domain::Depression.as_str(), config.depression_path(), mode)?;
        let flight = ArtifactStore::new(Domain::Flight.as_str(), config.flight_path(), mode)?;
        let animal = ArtifactStore::new(Domain::Animal.as_str(), config.animal_source(), mode)?;
        let recommend = ArtifactStore::new(Domain::Recommend.as_str(), config.recommend_path(), mode)?;

        Ok(Self {
            depression: DepressionGateway::new(Arc::new(depression)),
            flight: FlightGateway::new(Arc::new(flight)),
            animal: AnimalGateway::new(Arc::new(animal)),
            recommend: RecommendGateway::new(Arc::new(recommend), config.search.max_top_k),
        })
    }

    /// Re-read one domain's artifact, keeping the old one on failure
    pub fn reload(&self, domain: Domain) -> Result<ArtifactInfo> {
        match domain {
            Domain::Depression => {
                self.depression.store().reload()?;
            }
            Domain::Flight => {
                self.flight.store().reload()?;
            }
            Domain::Animal => {
                self.animal.store().reload()?;
            }
            Domain::Recommend => {
                self.recommend.store().reload()?;
            }
        }
        Ok(self.info(domain))
    }

    pub fn info(&self, domain: Domain) -> ArtifactInfo {
        match domain {
            Domain::Depression => self.depression.store().info(),
            Domain::Flight => self.flight.store().info(),
            Domain::Animal => self.animal.store().info(),
            Domain::Recommend => self.recommend.store().info(),
        }
    }

    /// State of every artifact, without forcing lazy loads
    pub fn artifacts(&self) -> Vec<ArtifactInfo> {
        Domain::ALL.into_iter().map(|d| self.info(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::LoadMode;

    #[test]
    fn test_domain_parse() {
        assert_eq!("flight".parse::<Domain>().unwrap(), Domain::Flight);
        assert_eq!("Animal".parse::<Domain>().unwrap(), Domain::Animal);
        assert_eq!(
            "weather".parse::<Domain>().unwrap_err(),
            UnknownDomain("weather".to_string())
        );
        assert_eq!(Domain::Recommend.to_string(), "recommend");
    }

    #[test]
    fn test_eager_registry_fails_on_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelsConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(matches!(
            ModelRegistry::from_config(&config),
            Err(Error::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn test_lazy_registry_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelsConfig {
            dir: dir.path().to_path_buf(),
            load_mode: LoadMode::Lazy,
            ..Default::default()
        };
        let registry = ModelRegistry::from_config(&config).unwrap();

        let infos = registry.artifacts();
        assert_eq!(infos.len(), 4);
        assert!(infos.iter().all(|i| !i.loaded));
        assert_eq!(infos[2].domain, "animal");
        assert!(infos[2].path.ends_with("animal_cnn.safetensors"));

        assert!(matches!(
            registry.reload(Domain::Flight),
            Err(Error::ArtifactNotFound(_))
        ));
    }
}
