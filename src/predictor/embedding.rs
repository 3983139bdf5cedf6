//! Embedding-similarity predictor
//!
//! Finds concepts named by words close to the term in the embedding space.
//! For each neighbour word `w` whose stem is in the catalog, every record
//! `r` it hits receives `similarity(term, w) / (|hits(w)| + occ(r) - 1)`,
//! where `occ(r)` counts the neighbour words that hit `r`. A record reached
//! through several neighbours therefore shares its credit and no IRI can
//! exceed 1.0.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{scores_in_range, Prediction, Predictor};
use crate::analysis::NounAnalyzer;
use crate::catalog::{CatalogIndex, RecordId};
use crate::context::RecommenderContext;
use crate::decompound::TermDecompounder;
use crate::embedding::EmbeddingIndex;
use crate::types::{ScoreMap, Term};

pub const EMBEDDING_PREDICTOR: &str = "Embedding predictor";

pub struct EmbeddingPredictor {
    catalog: Arc<CatalogIndex>,
    index: Arc<EmbeddingIndex>,
    analyzer: Arc<dyn NounAnalyzer>,
    decompounder: Arc<TermDecompounder>,
    nearest_k: usize,
}

impl EmbeddingPredictor {
    pub fn new(
        catalog: Arc<CatalogIndex>,
        index: Arc<EmbeddingIndex>,
        analyzer: Arc<dyn NounAnalyzer>,
        decompounder: Arc<TermDecompounder>,
        nearest_k: usize,
    ) -> Self {
        Self {
            catalog,
            index,
            analyzer,
            decompounder,
            nearest_k,
        }
    }

    async fn score_word(&self, word: &str) -> Prediction {
        let neighbours = self.index.nearest(word, self.nearest_k).await;

        // Neighbour order is the model's similarity order, which keeps the
        // floating-point accumulation below deterministic.
        let mut hits: Vec<(&str, BTreeSet<RecordId>)> = Vec::new();
        for neighbour in neighbours.iter() {
            let Some(stemmed) = self.analyzer.analyze_word(&neighbour.to_lowercase()) else {
                continue;
            };
            let ids = self.catalog.hits(stemmed.stem());
            if !ids.is_empty() {
                hits.push((neighbour.as_str(), ids.iter().copied().collect()));
            }
        }

        let mut occurrences: HashMap<RecordId, usize> = HashMap::new();
        for (_, ids) in &hits {
            for id in ids {
                *occurrences.entry(*id).or_insert(0) += 1;
            }
        }

        let mut prediction = Prediction::default();
        for (neighbour, ids) in &hits {
            let Some(similarity) = self.index.similarity(word, neighbour).await else {
                continue;
            };
            if !similarity.is_finite() || similarity <= 0.0 {
                continue;
            }

            for id in ids {
                let Some(record) = self.catalog.record(*id) else {
                    continue;
                };
                let effective = ids.len() + occurrences[id] - 1;
                *prediction.scores.entry(record.iri.clone()).or_insert(0.0) +=
                    similarity / effective as f64;
                prediction
                    .evidence
                    .entry(record.iri.clone())
                    .or_default()
                    .insert(neighbour.to_string());
            }
        }

        for score in prediction.scores.values_mut() {
            *score = score.min(1.0);
        }
        prediction
    }
}

#[async_trait]
impl Predictor for EmbeddingPredictor {
    fn name(&self) -> &str {
        EMBEDDING_PREDICTOR
    }

    async fn score(&self, context: &RecommenderContext, term: &Term) -> ScoreMap {
        self.score_with_evidence(context, term).await.scores
    }

    async fn score_with_evidence(&self, _context: &RecommenderContext, term: &Term) -> Prediction {
        let mut prediction = self.score_word(&term.lookup_text()).await;

        if prediction.scores.is_empty() {
            let components = self.decompounder.decompound(term).await;
            let share = 1.0 / components.len().max(1) as f64;

            for component in &components {
                let partial = self.score_word(&component.lookup_text()).await;
                for (iri, score) in partial.scores {
                    *prediction.scores.entry(iri).or_insert(0.0) += score * share;
                }
                for (iri, words) in partial.evidence {
                    prediction.evidence.entry(iri).or_default().extend(words);
                }
            }
        }

        if !prediction.evidence.is_empty() {
            debug!(term = term.text(), evidence = ?prediction.evidence, "Embedding neighbours");
        }
        debug_assert!(scores_in_range(&prediction.scores, false));
        prediction
    }
}
