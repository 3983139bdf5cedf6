//! Linker configuration
//!
//! Loaded from YAML (`from_file` / `from_yaml`) or assembled from the
//! environment (`from_env`). Every field has a default, so an empty document
//! is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkerError, Result};

/// Application home; models live under `<home>/models`
pub const HOME_ENV: &str = "CONCEPT_LINKER_HOME";

/// Direct override of the models directory
pub const MODELS_DIR_ENV: &str = "CONCEPT_LINKER_MODELS_DIR";

/// Decompounding service endpoint override
pub const DECOMPOUNDER_URL_ENV: &str = "CONCEPT_LINKER_DECOMPOUNDER_URL";

pub const DEFAULT_LOOKUP_FILE: &str = "coclass-lookup.bin";
pub const DEFAULT_VECTORS_FILE: &str = "word2vec-sv.bin";

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Directory holding the lookup and vectors snapshots.
    /// `None` means "derive from the environment".
    pub models_dir: Option<PathBuf>,
    pub lookup_file: LookupFile,
    pub vectors_file: VectorsFile,
    pub traits: ScoringTraits,
    pub embedding: EmbeddingConfig,
    pub decompounder: DecompounderConfig,
}

/// Thresholds an administrator tunes per recommender
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringTraits {
    /// Rejections of a (term, IRI) pair before it is vetoed; 0 disables
    pub max_rejects: u32,
    /// Finite totals below this are dropped from the ranking
    pub min_confidence: f64,
}

impl Default for ScoringTraits {
    fn default() -> Self {
        Self {
            max_rejects: 3,
            min_confidence: 0.05,
        }
    }
}

/// Embedding similarity index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Neighbour words fetched per (sub-)term
    pub nearest_k: usize,
    /// Upper bound on a single model query
    pub query_timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            nearest_k: 10,
            query_timeout_ms: 2000,
        }
    }
}

impl EmbeddingConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Compound-splitting service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompounderConfig {
    pub enabled: bool,
    pub url: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for DecompounderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:2020/".to_string(),
            connect_timeout_ms: 1000,
            read_timeout_ms: 1000,
        }
    }
}

impl DecompounderConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// File name of the catalog lookup snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupFile(pub String);

impl Default for LookupFile {
    fn default() -> Self {
        Self(DEFAULT_LOOKUP_FILE.to_string())
    }
}

/// File name of the word-vector snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorsFile(pub String);

impl Default for VectorsFile {
    fn default() -> Self {
        Self(DEFAULT_VECTORS_FILE.to_string())
    }
}

impl LinkerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: LinkerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, with the models directory and decompounder URL taken from
    /// the environment when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.models_dir = std::env::var(MODELS_DIR_ENV).ok().map(PathBuf::from);
        if let Ok(url) = std::env::var(DECOMPOUNDER_URL_ENV) {
            config.decompounder.url = url;
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        let mc = self.traits.min_confidence;
        if !(0.0..=1.0).contains(&mc) {
            return Err(LinkerError::Config(format!(
                "min_confidence must lie in [0, 1], got {mc}"
            )));
        }
        if self.embedding.nearest_k == 0 {
            return Err(LinkerError::Config(
                "embedding.nearest_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the models directory: explicit setting, then
    /// `$CONCEPT_LINKER_MODELS_DIR`, then `$CONCEPT_LINKER_HOME/models`.
    pub fn resolve_models_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.models_dir {
            return Some(dir.clone());
        }
        if let Ok(dir) = std::env::var(MODELS_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        std::env::var(HOME_ENV)
            .ok()
            .map(|home| PathBuf::from(home).join("models"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = LinkerConfig::from_yaml("{}").unwrap();
        assert_eq!(config.traits.max_rejects, 3);
        assert!((config.traits.min_confidence - 0.05).abs() < 1e-12);
        assert_eq!(config.embedding.nearest_k, 10);
        assert_eq!(config.decompounder.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.lookup_file.0, DEFAULT_LOOKUP_FILE);
        assert_eq!(config.vectors_file.0, DEFAULT_VECTORS_FILE);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
models_dir: /srv/linker/models
traits:
  max_rejects: 0
decompounder:
  enabled: false
"#;
        let config = LinkerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.traits.max_rejects, 0);
        assert!((config.traits.min_confidence - 0.05).abs() < 1e-12);
        assert!(!config.decompounder.enabled);
        assert_eq!(
            config.resolve_models_dir(),
            Some(PathBuf::from("/srv/linker/models"))
        );
    }

    #[test]
    fn test_min_confidence_out_of_range() {
        let err = LinkerConfig::from_yaml("traits:\n  min_confidence: 1.5\n").unwrap_err();
        assert!(matches!(err, LinkerError::Config(_)));
    }

    #[test]
    fn test_zero_nearest_k_rejected() {
        let err = LinkerConfig::from_yaml("embedding:\n  nearest_k: 0\n").unwrap_err();
        assert!(matches!(err, LinkerError::Config(_)));
    }
}
