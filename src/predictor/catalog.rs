//! Catalog-frequency predictor
//!
//! A term found under `n` distinct catalog records gives each of them `1/n`:
//! a unique match scores 1.0, an ambiguous one is diluted.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{scores_in_range, Predictor};
use crate::catalog::{CatalogIndex, RecordId};
use crate::context::RecommenderContext;
use crate::decompound::TermDecompounder;
use crate::types::{ScoreMap, Term};

pub const CATALOG_PREDICTOR: &str = "Catalog predictor";

pub struct CatalogPredictor {
    catalog: Arc<CatalogIndex>,
    decompounder: Arc<TermDecompounder>,
}

impl CatalogPredictor {
    pub fn new(catalog: Arc<CatalogIndex>, decompounder: Arc<TermDecompounder>) -> Self {
        Self {
            catalog,
            decompounder,
        }
    }

    /// Distinct records under the term's stem, or under its components'
    /// stems when the stem itself is unknown.
    async fn hits(&self, term: &Term) -> BTreeSet<RecordId> {
        let mut hits: BTreeSet<RecordId> = self.catalog.hits(term.stem()).iter().copied().collect();
        if !hits.is_empty() {
            return hits;
        }

        for component in self.decompounder.decompound(term).await {
            hits.extend(self.catalog.hits(component.stem()).iter().copied());
        }
        if !hits.is_empty() {
            debug!(term = term.text(), hits = hits.len(), "Matched via decompounding");
        }
        hits
    }
}

#[async_trait]
impl Predictor for CatalogPredictor {
    fn name(&self) -> &str {
        CATALOG_PREDICTOR
    }

    async fn score(&self, _context: &RecommenderContext, term: &Term) -> ScoreMap {
        let hits = self.hits(term).await;
        let mut scores = ScoreMap::new();
        if hits.is_empty() {
            return scores;
        }

        let share = 1.0 / hits.len() as f64;
        for record in hits.into_iter().filter_map(|id| self.catalog.record(id)) {
            scores.insert(record.iri.clone(), share);
        }

        debug_assert!(scores_in_range(&scores, false));
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PlainAnalyzer;
    use crate::decompound::CompoundSplitter;
    use crate::error::Result;
    use crate::types::ConceptRecord;

    struct FixedSplitter(Vec<&'static str>);

    #[async_trait]
    impl CompoundSplitter for FixedSplitter {
        async fn split(&self, _word: &str) -> Result<Option<Vec<String>>> {
            Ok(Some(self.0.iter().map(|s| s.to_string()).collect()))
        }
    }

    fn record(iri: &str, nouns: &[&str]) -> ConceptRecord {
        let mut r = ConceptRecord::new(iri);
        r.name = Some(iri.to_string());
        for n in nouns {
            r.add_noun(n);
        }
        r
    }

    fn predictor(splitter: Option<Vec<&'static str>>) -> CatalogPredictor {
        let catalog = CatalogIndex::from_records(vec![
            record("X1", &["katt"]),
            record("X2", &["katt", "hund"]),
            record("X3", &["dörr"]),
        ]);
        let analyzer = Arc::new(PlainAnalyzer);
        let decompounder = match splitter {
            Some(parts) => TermDecompounder::new(Arc::new(FixedSplitter(parts)), analyzer),
            None => TermDecompounder::disabled(analyzer),
        };
        CatalogPredictor::new(Arc::new(catalog), Arc::new(decompounder))
    }

    fn term(stem: &str) -> Term {
        Term::new(stem, stem, "NN", 0, stem.len())
    }

    #[tokio::test]
    async fn test_shared_stem_is_diluted() {
        let p = predictor(None);
        let ctx = RecommenderContext::new();

        let katt = p.score(&ctx, &term("katt")).await;
        assert_eq!(katt.len(), 2);
        assert_eq!(katt["X1"], 0.5);
        assert_eq!(katt["X2"], 0.5);

        let hund = p.score(&ctx, &term("hund")).await;
        assert_eq!(hund.len(), 1);
        assert_eq!(hund["X2"], 1.0);
    }

    #[tokio::test]
    async fn test_miss_without_decompounding_is_empty() {
        let p = predictor(None);
        assert!(p.score(&RecommenderContext::new(), &term("bil")).await.is_empty());
    }

    #[tokio::test]
    async fn test_miss_falls_back_to_components() {
        let p = predictor(Some(vec!["ytter", "dörr"]));
        let scores = p.score(&RecommenderContext::new(), &term("ytterdörr")).await;
        assert_eq!(scores.len(), 1);
        assert_eq!(scores["X3"], 1.0);
    }

    #[tokio::test]
    async fn test_duplicate_component_hits_counted_once() {
        // "hund" and "katt" both reach X2; it must count once.
        let p = predictor(Some(vec!["hund", "katt"]));
        let scores = p.score(&RecommenderContext::new(), &term("hundkatt")).await;
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["X1"], 0.5);
        assert_eq!(scores["X2"], 0.5);
    }

    #[tokio::test]
    async fn test_direct_hit_skips_decompounding() {
        let p = predictor(Some(vec!["dörr"]));
        let scores = p.score(&RecommenderContext::new(), &term("hund")).await;
        assert_eq!(scores.len(), 1);
        assert_eq!(scores["X2"], 1.0);
        assert_eq!(p.decompounder.cached_len().await, 0);
    }
}
