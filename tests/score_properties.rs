//! Property tests for score ranges and ranking order

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use concept_linker::config::EmbeddingConfig;
use concept_linker::predictor::{scores_in_range, CatalogPredictor, EmbeddingPredictor, Predictor};
use concept_linker::{
    CatalogIndex, ConceptRecord, EmbeddingIndex, EnsembleScorer, NounAnalyzer, PlainAnalyzer,
    RecommenderContext, ScoreMap, Term, TermDecompounder, WordVectorModel,
};

const STEMS: &[&str] = &["katt", "hund", "bil", "dörr", "vägg", "tak"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// -- Strategy helpers --

fn arb_catalog() -> impl Strategy<Value = CatalogIndex> {
    prop::collection::vec(prop::sample::subsequence(STEMS.to_vec(), 1..=3), 1..8).prop_map(
        |records| {
            CatalogIndex::from_records(records.into_iter().enumerate().map(|(i, nouns)| {
                let mut record = ConceptRecord::new(format!("X{i}"));
                record.name = Some(format!("concept {i}"));
                for noun in nouns {
                    record.add_noun(noun);
                }
                record
            }))
        },
    )
}

fn arb_scores() -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec(
        (
            0u8..6,
            prop_oneof![
                8 => (0.001f64..=1.0),
                1 => Just(f64::NEG_INFINITY),
            ],
        ),
        0..6,
    )
}

/// Neighbour words of the query with their similarity, most similar first
fn arb_neighbours() -> impl Strategy<Value = Vec<(&'static str, f64)>> {
    (
        prop::sample::subsequence(STEMS.to_vec(), 0..=STEMS.len()),
        prop::collection::vec(-1.0f64..=1.0, STEMS.len()),
    )
        .prop_map(|(words, sims)| {
            let mut neighbours: Vec<(&'static str, f64)> = words.into_iter().zip(sims).collect();
            neighbours.sort_by(|a, b| b.1.total_cmp(&a.1));
            neighbours
        })
}

/// Model answering only for the query word "auto"
struct TableModel {
    neighbours: Vec<(&'static str, f64)>,
}

impl WordVectorModel for TableModel {
    fn nearest(&self, word: &str, k: usize) -> Vec<String> {
        if word != "auto" {
            return Vec::new();
        }
        self.neighbours.iter().take(k).map(|(w, _)| w.to_string()).collect()
    }

    fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let other = match (a, b) {
            ("auto", other) | (other, "auto") => other,
            _ => return None,
        };
        let sims: HashMap<&str, f64> = self.neighbours.iter().copied().collect();
        sims.get(other).copied()
    }
}

struct FixedPredictor {
    name: String,
    scores: ScoreMap,
}

#[async_trait]
impl Predictor for FixedPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _context: &RecommenderContext, _term: &Term) -> ScoreMap {
        self.scores.clone()
    }
}

fn score_map(scores: Vec<(u8, f64)>) -> ScoreMap {
    scores
        .into_iter()
        .map(|(iri, s)| (format!("X{iri}"), s))
        .collect()
}

fn fixed(i: usize, scores: ScoreMap) -> Arc<dyn Predictor> {
    Arc::new(FixedPredictor {
        name: format!("P{i}"),
        scores,
    })
}

proptest! {
    /// Catalog scores lie in (0, 1] and never sum past 1.
    #[test]
    fn catalog_scores_in_unit_range(catalog in arb_catalog(), stem in prop::sample::select(STEMS.to_vec())) {
        let analyzer: Arc<dyn NounAnalyzer> = Arc::new(PlainAnalyzer);
        let predictor = CatalogPredictor::new(
            Arc::new(catalog),
            Arc::new(TermDecompounder::disabled(analyzer)),
        );
        let term = Term::new(stem, stem, "NN", 0, stem.len());

        let scores = runtime().block_on(predictor.score(&RecommenderContext::new(), &term));
        prop_assert!(scores_in_range(&scores, false));
        let sum: f64 = scores.values().sum();
        prop_assert!(scores.is_empty() || (sum - 1.0).abs() < 1e-9);
    }

    /// Embedding scores lie in (0, 1] and no IRI gets more than the best
    /// neighbour similarity, however the neighbours share records.
    #[test]
    fn embedding_scores_in_unit_range(catalog in arb_catalog(), neighbours in arb_neighbours()) {
        let best = neighbours.iter().map(|(_, s)| *s).fold(0.0f64, f64::max);
        let analyzer: Arc<dyn NounAnalyzer> = Arc::new(PlainAnalyzer);
        let index = EmbeddingIndex::new(
            Arc::new(TableModel { neighbours }),
            &EmbeddingConfig::default(),
        );
        let predictor = EmbeddingPredictor::new(
            Arc::new(catalog),
            Arc::new(index),
            analyzer.clone(),
            Arc::new(TermDecompounder::disabled(analyzer)),
            STEMS.len(),
        );
        let term = Term::new("auto", "auto", "NN", 0, 4);

        let prediction = runtime().block_on(
            predictor.score_with_evidence(&RecommenderContext::new(), &term),
        );
        prop_assert!(scores_in_range(&prediction.scores, false));
        for score in prediction.scores.values() {
            prop_assert!(*score <= best + 1e-9);
        }
        let mut scored: Vec<&String> = prediction.scores.keys().collect();
        scored.sort();
        prop_assert!(scored.into_iter().eq(prediction.evidence.keys()));
    }

    /// Ranked output is non-increasing, vetoed IRIs come last with −∞, and
    /// finite totals stay within [0, 1].
    #[test]
    fn ensemble_output_is_ordered(a in arb_scores(), b in arb_scores(), c in arb_scores()) {
        let maps = [score_map(a), score_map(b), score_map(c)];
        let vetoed: Vec<String> = maps.iter()
            .flat_map(|m| m.iter())
            .filter(|(_, s)| **s == f64::NEG_INFINITY)
            .map(|(iri, _)| iri.clone())
            .collect();
        let [a, b, c] = maps;
        let scorer = EnsembleScorer::new(vec![fixed(0, a), fixed(1, b), fixed(2, c)], 0.0);
        let term = Term::from_text("bil");

        let rt = runtime();
        let first = rt.block_on(scorer.predict(&RecommenderContext::new(), &term));
        let second = rt.block_on(scorer.predict(&RecommenderContext::new(), &term));
        prop_assert_eq!(&first, &second);

        for pair in first.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        for suggestion in &first {
            if vetoed.contains(&suggestion.iri) {
                prop_assert_eq!(suggestion.score, f64::NEG_INFINITY);
            } else {
                prop_assert!(suggestion.score > 0.0 && suggestion.score <= 1.0 + 1e-9);
            }
        }
    }
}
