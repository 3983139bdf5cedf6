//! Per-recommender state shared between training and prediction

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{LinkerError, Result};
use crate::model::CoOccurrenceModel;

#[derive(Default)]
struct ContextState {
    model: Option<Arc<CoOccurrenceModel>>,
    ready: bool,
    closed: bool,
}

/// Holds the trained co-occurrence model of one recommender.
///
/// Once closed, the context refuses new data but keeps serving the model it
/// already holds.
#[derive(Default)]
pub struct RecommenderContext {
    state: RwLock<ContextState>,
}

impl RecommenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pre-populated with a model, ready for prediction
    pub fn with_model(model: CoOccurrenceModel) -> Self {
        Self {
            state: RwLock::new(ContextState {
                model: Some(Arc::new(model)),
                ready: true,
                closed: false,
            }),
        }
    }

    pub async fn put_model(&self, model: CoOccurrenceModel) -> Result<()> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(LinkerError::ContextClosed);
        }
        state.model = Some(Arc::new(model));
        Ok(())
    }

    pub async fn model(&self) -> Option<Arc<CoOccurrenceModel>> {
        self.state.read().await.model.clone()
    }

    pub async fn mark_ready(&self) {
        self.state.write().await.ready = true;
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    pub async fn close(&self) {
        self.state.write().await.closed = true;
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let ctx = RecommenderContext::new();
        assert!(ctx.model().await.is_none());
        assert!(!ctx.is_ready().await);

        let mut model = CoOccurrenceModel::default();
        model.record("bil", "X1");
        ctx.put_model(model).await.unwrap();
        ctx.mark_ready().await;

        assert!(ctx.is_ready().await);
        assert_eq!(ctx.model().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_context_rejects_put() {
        let ctx = RecommenderContext::with_model(CoOccurrenceModel::default());
        ctx.close().await;

        let err = ctx.put_model(CoOccurrenceModel::default()).await.unwrap_err();
        assert!(matches!(err, LinkerError::ContextClosed));
        assert!(ctx.model().await.is_some());
    }
}
