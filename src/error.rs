//! Error types for the concept linker
//!
//! Construction and load failures are surfaced through `LinkerError`.
//! Scoring never returns these to the caller: predictors log and degrade.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the linker
#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("Catalog build failed: {0}")]
    CatalogBuild(String),

    #[error("Vocabulary source error: {0}")]
    Vocabulary(String),

    #[error("Snapshot version mismatch in {path}: expected {expected}, got {found}")]
    SnapshotVersion {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("Snapshot {path} is corrupt: {reason}")]
    SnapshotCorrupt { path: PathBuf, reason: String },

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Decompounding failed for '{word}': {reason}")]
    Decompound { word: String, reason: String },

    #[error("History store error: {0}")]
    History(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Adding data to a closed recommender context is not permitted")]
    ContextClosed,

    #[error("Term analysis failed: {0}")]
    Analysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Binary serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LinkerError>;
