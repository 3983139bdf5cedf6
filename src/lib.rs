//! Concept Linker
//!
//! Links nouns in annotated documents to concepts of a controlled vocabulary
//! (identified by IRIs) and explains every suggestion.
//!
//! # Architecture
//!
//! ```text
//! Noun token ("ytterdörr")
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Catalog predictor                      │
//! │  stem → records, 1/n per hit            │
//! │  miss → decompound (ytter + dörr)       │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Embedding predictor                    │
//! │  k nearest words → catalog stems        │
//! │  similarity shared across neighbours    │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  History predictor                      │
//! │  co-occurrence model → 1/n reinforcement│
//! │  ≥ max_rejects rejections → −∞ veto     │
//! └─────────────────────────────────────────┘
//!       │
//!       ▼
//! ┌─────────────────────────────────────────┐
//! │  Ensemble: × 1/#predictors, merge,      │
//! │  min-confidence filter, ranked output   │
//! │  "Catalog predictor: 0.33 | ..."        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The catalog and word vectors are loaded from bincode snapshots in the
//! models directory (`coclass-lookup.bin`, `word2vec-sv.bin`); the catalog is
//! built from the vocabulary on first use.

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod context;
pub mod decompound;
pub mod embedding;
pub mod engine;
pub mod ensemble;
pub mod error;
pub mod model;
pub mod predictor;
pub mod types;

pub use analysis::{NounAnalyzer, PlainAnalyzer};
pub use catalog::{load_or_build, CatalogBuilder, CatalogIndex, JsonVocabulary, VocabularySource};
pub use config::LinkerConfig;
pub use context::RecommenderContext;
pub use decompound::{CompoundSplitter, HttpCompoundSplitter, TermDecompounder};
pub use embedding::{EmbeddingIndex, WordVectorModel, WordVectors};
pub use engine::{Availability, ConceptLinker, EngineStatus, LinkSuggestion, LinkerDeps};
pub use ensemble::{EnsembleScorer, Score, Suggestion};
pub use error::{LinkerError, Result};
pub use model::{AnnotatedDocument, CoOccurrenceModel, IriFrequency, LabelledSpan};
pub use predictor::{
    CatalogPredictor, EmbeddingPredictor, HistoryPredictor, HistoryStore, MemoryHistoryStore,
    Prediction, Predictor,
};
pub use types::*;
