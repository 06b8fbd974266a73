//! Configuration for artifact locations and loading

use crate::artifact::LoadMode;
use crate::vision::ImageSource;
use candle_core::Device;
use modelgate_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where each domain's artifact lives and how it is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory relative artifact paths are resolved against
    #[serde(default = "default_models_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub load_mode: LoadMode,

    /// Device for neural network inference
    #[serde(default)]
    pub device: DeviceSpec,

    #[serde(default = "default_depression")]
    pub depression: PathBuf,

    #[serde(default = "default_flight")]
    pub flight: PathBuf,

    #[serde(default)]
    pub animal: AnimalPaths,

    #[serde(default = "default_recommend")]
    pub recommend: PathBuf,

    #[serde(default)]
    pub search: SearchSettings,
}

/// Image artifact file names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalPaths {
    #[serde(default = "default_animal_model")]
    pub model: PathBuf,

    #[serde(default = "default_animal_weights")]
    pub weights: PathBuf,

    #[serde(default = "default_animal_labels")]
    pub labels: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Largest accepted `top_k`
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda { index: Option<usize> },
    Metal { index: Option<usize> },
}

impl DeviceSpec {
    /// Create the Candle device
    pub fn create(self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda { index } => Device::new_cuda(index.unwrap_or(0))
                .map_err(|e| Error::config(format!("Failed to create CUDA device: {}", e))),
            Self::Metal { index } => Device::new_metal(index.unwrap_or(0))
                .map_err(|e| Error::config(format!("Failed to create Metal device: {}", e))),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_models_dir(),
            load_mode: LoadMode::default(),
            device: DeviceSpec::default(),
            depression: default_depression(),
            flight: default_flight(),
            animal: AnimalPaths::default(),
            recommend: default_recommend(),
            search: SearchSettings::default(),
        }
    }
}

impl Default for AnimalPaths {
    fn default() -> Self {
        Self {
            model: default_animal_model(),
            weights: default_animal_weights(),
            labels: default_animal_labels(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_top_k: default_max_top_k(),
        }
    }
}

impl ModelsConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content).map_err(|e| Error::config(format!("Invalid models config: {}", e)))
    }

    /// Absolute paths are kept, relative ones are joined onto `dir`
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    pub fn depression_path(&self) -> PathBuf {
        self.resolve(&self.depression)
    }

    pub fn flight_path(&self) -> PathBuf {
        self.resolve(&self.flight)
    }

    pub fn recommend_path(&self) -> PathBuf {
        self.resolve(&self.recommend)
    }

    pub fn animal_source(&self) -> ImageSource {
        ImageSource {
            config: self.resolve(&self.animal.model),
            weights: self.resolve(&self.animal.weights),
            labels: self.resolve(&self.animal.labels),
            device: self.device,
        }
    }
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_depression() -> PathBuf {
    PathBuf::from("depression_model.json")
}

fn default_flight() -> PathBuf {
    PathBuf::from("flight_price_model.json")
}

fn default_recommend() -> PathBuf {
    PathBuf::from("recommender.json")
}

fn default_animal_model() -> PathBuf {
    PathBuf::from("animal_cnn.json")
}

fn default_animal_weights() -> PathBuf {
    PathBuf::from("animal_cnn.safetensors")
}

fn default_animal_labels() -> PathBuf {
    PathBuf::from("labels.json")
}

fn default_max_top_k() -> usize {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = ModelsConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ModelsConfig::default());
        assert_eq!(config.load_mode, LoadMode::Eager);
        assert_eq!(config.search.max_top_k, 50);
        assert_eq!(config.flight_path(), PathBuf::from("./models/flight_price_model.json"));
    }

    #[test]
    fn test_overrides() {
        let yaml = r#"
dir: /srv/models
load_mode: lazy
recommend: /data/netflix_index.json
animal:
  labels: animal_labels.json
search:
  max_top_k: 10
"#;
        let config = ModelsConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.load_mode, LoadMode::Lazy);
        assert_eq!(config.recommend_path(), PathBuf::from("/data/netflix_index.json"));

        let animal = config.animal_source();
        assert_eq!(animal.labels, PathBuf::from("/srv/models/animal_labels.json"));
        assert_eq!(animal.weights, PathBuf::from("/srv/models/animal_cnn.safetensors"));
        assert_eq!(config.search.max_top_k, 10);
    }

    #[test]
    fn test_device_spec() {
        let spec: DeviceSpec = serde_yaml::from_str("cpu").unwrap();
        assert_eq!(spec, DeviceSpec::Cpu);
        assert!(matches!(spec.create(), Ok(Device::Cpu)));
    }
}
