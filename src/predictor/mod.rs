//! Scoring strategies combined by the ensemble
//!
//! Each predictor maps a term to per-IRI confidences in (0, 1]. The history
//! predictor may additionally emit negative infinity to veto an IRI.

pub mod catalog;
pub mod embedding;
pub mod history;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::context::RecommenderContext;
use crate::types::{Iri, ScoreMap, Term};

pub use catalog::CatalogPredictor;
pub use embedding::EmbeddingPredictor;
pub use history::{HistoryPredictor, HistoryStore, MemoryHistoryStore};

/// Neighbour words that led to each IRI, for explanation output
pub type Evidence = BTreeMap<Iri, BTreeSet<String>>;

/// Scores plus the evidence that produced them
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    pub scores: ScoreMap,
    pub evidence: Evidence,
}

/// A scoring strategy
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Name shown in explanations
    fn name(&self) -> &str;

    async fn score(&self, context: &RecommenderContext, term: &Term) -> ScoreMap;

    /// Score and report evidence. Predictors without evidence return an
    /// empty evidence map.
    async fn score_with_evidence(&self, context: &RecommenderContext, term: &Term) -> Prediction {
        Prediction {
            scores: self.score(context, term).await,
            evidence: Evidence::new(),
        }
    }
}

/// True if every score lies in (0, 1], or is a veto when `allow_veto`.
pub fn scores_in_range(scores: &ScoreMap, allow_veto: bool) -> bool {
    scores.values().all(|&s| {
        (s > 0.0 && s <= 1.0 + f64::EPSILON) || (allow_veto && s == f64::NEG_INFINITY)
    })
}
