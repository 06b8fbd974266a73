//! Artifact loading and the per-domain Artifact Store

use modelgate_core::{Error, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A model bundle that can be read from durable storage.
///
/// Implementations are immutable once loaded: every request to a domain
/// shares the same instance through an `Arc`.
pub trait Artifact: Send + Sync + Sized + 'static {
    /// Where the artifact is read from (a path, or a set of paths)
    type Source: Clone + fmt::Debug + Send + Sync + 'static;

    /// Read and validate the artifact
    fn load(source: &Self::Source) -> Result<Self>;

    /// Primary file used for display in listings
    fn primary_path(source: &Self::Source) -> &Path;

    /// Descriptive metadata carried by the bundle
    fn meta(&self) -> ArtifactMeta {
        ArtifactMeta::default()
    }
}

/// Metadata carried alongside a model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactMeta {
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
}

/// Public description of one store's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub domain: String,
    pub path: PathBuf,
    pub loaded: bool,
    #[serde(flatten)]
    pub meta: ArtifactMeta,
}

/// When an artifact is first read from disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Load at construction and fail start-up on error
    #[default]
    Eager,
    /// Load on first use
    Lazy,
}

/// Process-wide handle to one domain's artifact.
///
/// Readers clone the inner `Arc`, so a reload swaps the artifact without
/// disturbing requests already holding the previous one.
pub struct ArtifactStore<A: Artifact> {
    domain: String,
    source: A::Source,
    slot: RwLock<Option<Arc<A>>>,
}

impl<A: Artifact> ArtifactStore<A> {
    /// Create a store, loading immediately in `Eager` mode
    pub fn new(domain: impl Into<String>, source: A::Source, mode: LoadMode) -> Result<Self> {
        let store = Self {
            domain: domain.into(),
            source,
            slot: RwLock::new(None),
        };

        if mode == LoadMode::Eager {
            store.get()?;
        }

        Ok(store)
    }

    /// Create a store around an artifact that is already in memory
    pub fn preloaded(domain: impl Into<String>, source: A::Source, artifact: A) -> Self {
        Self {
            domain: domain.into(),
            source,
            slot: RwLock::new(Some(Arc::new(artifact))),
        }
    }

    /// Current artifact, loading it on first access
    pub fn get(&self) -> Result<Arc<A>> {
        if let Some(artifact) = self.slot.read().as_ref() {
            return Ok(Arc::clone(artifact));
        }

        // Two callers may both load here; the first insert wins.
        let loaded = Arc::new(self.load_from_source()?);
        let mut slot = self.slot.write();
        Ok(Arc::clone(slot.get_or_insert(loaded)))
    }

    /// Re-read the artifact and swap it in. On failure the previous
    /// artifact stays in service.
    pub fn reload(&self) -> Result<Arc<A>> {
        match self.load_from_source() {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                *self.slot.write() = Some(Arc::clone(&artifact));
                Ok(artifact)
            }
            Err(e) => {
                warn!(domain = %self.domain, error = %e, "Artifact reload failed, keeping previous");
                Err(e)
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn source(&self) -> &A::Source {
        &self.source
    }

    /// Describe the store without forcing a load
    pub fn info(&self) -> ArtifactInfo {
        let current = self.slot.read().clone();
        ArtifactInfo {
            domain: self.domain.clone(),
            path: A::primary_path(&self.source).to_path_buf(),
            loaded: current.is_some(),
            meta: current.map(|a| a.meta()).unwrap_or_default(),
        }
    }

    fn load_from_source(&self) -> Result<A> {
        let start = Instant::now();
        let artifact = A::load(&self.source)?;
        info!(
            domain = %self.domain,
            path = %A::primary_path(&self.source).display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded artifact"
        );
        Ok(artifact)
    }
}

impl<A: Artifact> fmt::Debug for ArtifactStore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("domain", &self.domain)
            .field("source", &self.source)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Read a file, mapping absence to `ArtifactNotFound`
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::ArtifactNotFound(path.to_path_buf()))
        }
        Err(e) => Err(Error::corrupt(path, format!("unreadable: {}", e))),
    }
}

/// Read and deserialize a JSON artifact file
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(path, e.to_string()))
}
