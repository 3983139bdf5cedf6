//! History (feedback) predictor
//!
//! Two effects on a term:
//! - reinforcement: IRIs annotators attached to the term before get
//!   `1 / (distinct IRIs for the term)` from the trained model
//! - suppression: IRIs the current user rejected for the term at least
//!   `max_rejects` times get negative infinity, overriding reinforcement

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use super::{scores_in_range, Predictor};
use crate::context::RecommenderContext;
use crate::error::Result;
use crate::types::{Decision, HistoryRecord, Iri, ScoreMap, Term};

pub const HISTORY_PREDICTOR: &str = "History predictor";

/// Read access to recorded accept/reject decisions
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn list_records(&self, user: &str, layer: &str) -> Result<Vec<HistoryRecord>>;
}

/// In-process history store
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<HashMap<String, Vec<HistoryRecord>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, user: &str, record: HistoryRecord) {
        self.records
            .write()
            .await
            .entry(user.to_string())
            .or_default()
            .push(record);
    }

    /// Convenience for tests and the CLI: record one rejection
    pub async fn reject(&self, user: &str, layer: &str, term: &str, iri: &str) {
        self.record(
            user,
            HistoryRecord {
                term: term.to_string(),
                iri: iri.to_string(),
                decision: Decision::Rejected,
                layer: layer.to_string(),
            },
        )
        .await;
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn list_records(&self, user: &str, layer: &str) -> Result<Vec<HistoryRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(user)
            .map(|records| records.iter().filter(|r| r.layer == layer).cloned().collect())
            .unwrap_or_default())
    }
}

/// Lowercased term → IRI → rejection count
type RejectionTable = HashMap<String, BTreeMap<Iri, u32>>;

pub struct HistoryPredictor {
    store: Arc<dyn HistoryStore>,
    user: String,
    layer: String,
    max_rejects: u32,
    rejections: OnceCell<RejectionTable>,
}

impl HistoryPredictor {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        user: impl Into<String>,
        layer: impl Into<String>,
        max_rejects: u32,
    ) -> Self {
        Self {
            store,
            user: user.into(),
            layer: layer.into(),
            max_rejects,
            rejections: OnceCell::new(),
        }
    }

    /// Rejection counts, fetched from the store on first use. A failed
    /// fetch is retried on the next call.
    async fn rejections(&self) -> Option<&RejectionTable> {
        let loaded = self
            .rejections
            .get_or_try_init(|| async {
                let records = self.store.list_records(&self.user, &self.layer).await?;
                let mut table = RejectionTable::new();
                for record in records.iter().filter(|r| r.decision == Decision::Rejected) {
                    *table
                        .entry(record.term.to_lowercase())
                        .or_default()
                        .entry(record.iri.clone())
                        .or_insert(0) += 1;
                }
                info!(
                    user = %self.user,
                    layer = %self.layer,
                    records = records.len(),
                    rejected_terms = table.len(),
                    "History loaded"
                );
                Ok::<_, crate::error::LinkerError>(table)
            })
            .await;

        match loaded {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(user = %self.user, error = %e, "History unavailable, no suppression");
                None
            }
        }
    }
}

#[async_trait]
impl Predictor for HistoryPredictor {
    fn name(&self) -> &str {
        HISTORY_PREDICTOR
    }

    async fn score(&self, context: &RecommenderContext, term: &Term) -> ScoreMap {
        let key = term.lookup_text();
        let mut scores = ScoreMap::new();

        if let Some(model) = context.model().await {
            if let Some(frequency) = model.get(&key) {
                let share = 1.0 / frequency.distinct_iris() as f64;
                for iri in frequency.entries().keys() {
                    scores.insert(iri.clone(), share);
                }
            }
        }

        if self.max_rejects > 0 {
            if let Some(counts) = self.rejections().await.and_then(|t| t.get(&key)) {
                for (iri, rejected) in counts {
                    if *rejected >= self.max_rejects {
                        debug!(term = %key, iri = %iri, rejected, "Suppressed by history");
                        scores.insert(iri.clone(), f64::NEG_INFINITY);
                    }
                }
            }
        }

        debug_assert!(scores_in_range(&scores, true));
        scores
    }
}
