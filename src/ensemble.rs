//! Ensemble scorer
//!
//! Runs every predictor on a term, weights each by `1/n`, and merges the
//! per-IRI results into a ranked, explainable list.
//!
//! ```text
//!   Term ──┬─► CatalogPredictor   ──┐
//!          ├─► EmbeddingPredictor ──┼─► × 1/n ─► Score per IRI ─► filter ─► rank
//!          └─► HistoryPredictor   ──┘            (−∞ is absolute)
//! ```
//!
//! Ranking: total descending, then the contributions of the predictors in
//! registration order (descending), then IRI ascending. Identical inputs and
//! cache state always give identical output.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::context::RecommenderContext;
use crate::predictor::Predictor;
use crate::types::{Iri, Term};

/// Per-IRI accumulator of weighted predictor contributions
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    contributions: Vec<(String, f64)>,
    slots: Vec<f64>,
    total: f64,
}

impl Score {
    fn new(predictors: usize) -> Self {
        Self {
            contributions: Vec::new(),
            slots: vec![0.0; predictors],
            total: 0.0,
        }
    }

    fn add(&mut self, slot: usize, predictor: &str, value: f64) {
        self.contributions.push((predictor.to_string(), value));
        self.slots[slot] = value;
        if value == f64::NEG_INFINITY {
            self.total = f64::NEG_INFINITY;
        } else if self.total.is_finite() {
            self.total += value;
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn is_suppressed(&self) -> bool {
        self.total == f64::NEG_INFINITY
    }

    /// (predictor name, weighted contribution) in registration order
    pub fn contributions(&self) -> &[(String, f64)] {
        &self.contributions
    }

    /// `"<predictor>: <value>"` for each contribution, largest first,
    /// joined by `" | "`.
    pub fn explanation(&self) -> String {
        let mut sorted: Vec<&(String, f64)> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted
            .iter()
            .map(|(name, value)| format!("{name}: {value:.2}"))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn tie_break(&self, other: &Self) -> Ordering {
        self.slots
            .iter()
            .zip(&other.slots)
            .map(|(a, b)| b.total_cmp(a))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

/// One ranked candidate for a term
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub iri: Iri,
    pub score: f64,
    pub explanation: String,
    pub contributions: Vec<(String, f64)>,
    /// Embedding neighbour words that led to this IRI
    pub evidence: BTreeSet<String>,
}

impl Suggestion {
    pub fn is_suppressed(&self) -> bool {
        self.score == f64::NEG_INFINITY
    }
}

/// Weighted combination of predictors
pub struct EnsembleScorer {
    predictors: Vec<Arc<dyn Predictor>>,
    min_confidence: f64,
}

impl EnsembleScorer {
    pub fn new(predictors: Vec<Arc<dyn Predictor>>, min_confidence: f64) -> Self {
        Self {
            predictors,
            min_confidence,
        }
    }

    pub fn predictor_names(&self) -> Vec<&str> {
        self.predictors.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    /// Rank candidate IRIs for `term`.
    ///
    /// Finite totals below the minimum confidence are dropped. Suppressed
    /// IRIs are kept with a total of negative infinity and rank last.
    #[instrument(skip(self, context, term), fields(term = term.text()))]
    pub async fn predict(&self, context: &RecommenderContext, term: &Term) -> Vec<Suggestion> {
        if self.predictors.is_empty() {
            return Vec::new();
        }
        let weight = 1.0 / self.predictors.len() as f64;

        let predictions = join_all(
            self.predictors
                .iter()
                .map(|p| p.score_with_evidence(context, term)),
        )
        .await;

        let mut scores: HashMap<Iri, Score> = HashMap::new();
        let mut evidence: HashMap<Iri, BTreeSet<String>> = HashMap::new();

        for (slot, (predictor, prediction)) in self.predictors.iter().zip(predictions).enumerate() {
            for (iri, raw) in prediction.scores {
                let value = if raw == f64::NEG_INFINITY {
                    raw
                } else {
                    raw * weight
                };
                scores
                    .entry(iri)
                    .or_insert_with(|| Score::new(self.predictors.len()))
                    .add(slot, predictor.name(), value);
            }
            for (iri, words) in prediction.evidence {
                evidence.entry(iri).or_default().extend(words);
            }
        }

        let mut ranked: Vec<(Iri, Score)> = scores
            .into_iter()
            .filter(|(_, s)| s.is_suppressed() || s.total() >= self.min_confidence)
            .collect();

        debug_assert!(ranked
            .iter()
            .all(|(_, s)| s.is_suppressed() || (0.0..=1.0 + 1e-9).contains(&s.total())));

        ranked.sort_by(|(iri_a, a), (iri_b, b)| {
            b.total()
                .total_cmp(&a.total())
                .then_with(|| a.tie_break(b))
                .then_with(|| iri_a.cmp(iri_b))
        });

        let suggestions: Vec<Suggestion> = ranked
            .into_iter()
            .map(|(iri, score)| Suggestion {
                evidence: evidence.remove(&iri).unwrap_or_default(),
                explanation: score.explanation(),
                score: score.total(),
                contributions: score.contributions,
                iri,
            })
            .collect();

        debug!(
            candidates = suggestions.len(),
            top = suggestions.first().map(|s| s.iri.as_str()),
            "Term scored"
        );
        suggestions
    }
}
