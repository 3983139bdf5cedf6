//! Concept linker engine
//!
//! Wires the catalog, word vectors, decompounder and predictors together.
//! Construction never fails: a missing models directory, vocabulary or
//! vectors snapshot disables the affected predictors and is reported through
//! [`EngineStatus`], and the engine keeps answering with what is left.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::analysis::NounAnalyzer;
use crate::catalog::{load_or_build, CatalogIndex, VocabularySource};
use crate::config::LinkerConfig;
use crate::context::RecommenderContext;
use crate::decompound::{HttpCompoundSplitter, SharedSplitter, TermDecompounder};
use crate::embedding::{EmbeddingIndex, SharedModel, WordVectors};
use crate::ensemble::{EnsembleScorer, Suggestion};
use crate::error::Result;
use crate::model::{AnnotatedDocument, CoOccurrenceModel};
use crate::predictor::{
    CatalogPredictor, EmbeddingPredictor, HistoryPredictor, HistoryStore, Predictor,
};
use crate::types::{Iri, Term};

/// Whether a component could be set up
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum Availability {
    Ready,
    Unavailable(String),
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }
}

/// Which data sources the engine is running with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub models_dir: Option<PathBuf>,
    pub catalog: Availability,
    pub embeddings: Availability,
    pub decompounding: bool,
    pub predictors: Vec<String>,
}

/// Collaborators the engine does not own
pub struct LinkerDeps {
    pub analyzer: Arc<dyn NounAnalyzer>,
    pub history: Arc<dyn HistoryStore>,
    pub user: String,
    pub layer: String,
    pub vocabulary: Option<Arc<dyn VocabularySource>>,
    pub catalog: Option<Arc<CatalogIndex>>,
    pub vectors: Option<SharedModel>,
    pub splitter: Option<SharedSplitter>,
}

impl LinkerDeps {
    pub fn new(
        analyzer: Arc<dyn NounAnalyzer>,
        history: Arc<dyn HistoryStore>,
        user: impl Into<String>,
        layer: impl Into<String>,
    ) -> Self {
        Self {
            analyzer,
            history,
            user: user.into(),
            layer: layer.into(),
            vocabulary: None,
            catalog: None,
            vectors: None,
            splitter: None,
        }
    }

    /// Vocabulary used to build the lookup file when it does not exist yet
    pub fn with_vocabulary(mut self, vocabulary: Arc<dyn VocabularySource>) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Use this catalog instead of the lookup file
    pub fn with_catalog(mut self, catalog: CatalogIndex) -> Self {
        self.catalog = Some(Arc::new(catalog));
        self
    }

    /// Use this model instead of the vectors snapshot
    pub fn with_vectors(mut self, vectors: SharedModel) -> Self {
        self.vectors = Some(vectors);
        self
    }

    /// Use this splitter instead of the configured HTTP service
    pub fn with_splitter(mut self, splitter: SharedSplitter) -> Self {
        self.splitter = Some(splitter);
        self
    }
}

/// A suggestion attached to a token span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSuggestion {
    pub begin: usize,
    pub end: usize,
    pub iri: Iri,
    pub score: f64,
    pub explanation: String,
}

pub struct ConceptLinker {
    analyzer: Arc<dyn NounAnalyzer>,
    catalog: Option<Arc<CatalogIndex>>,
    scorer: EnsembleScorer,
    status: EngineStatus,
}

impl ConceptLinker {
    pub async fn new(config: &LinkerConfig, deps: LinkerDeps) -> Self {
        let models_dir = config.resolve_models_dir();
        if models_dir.is_none() {
            error!("Could not determine models directory");
        }

        let analyzer = deps.analyzer.clone();
        let decompounder = Arc::new(build_decompounder(config, deps.splitter, analyzer.clone()));

        let (catalog, catalog_state) = match deps.catalog {
            Some(catalog) => (Some(catalog), Availability::Ready),
            None => match &models_dir {
                None => (None, unavailable("models directory unknown")),
                Some(dir) => {
                    let path = dir.join(&config.lookup_file.0);
                    match load_or_build(&path, deps.vocabulary.as_deref(), analyzer.as_ref()).await
                    {
                        Ok(index) => (Some(Arc::new(index)), Availability::Ready),
                        Err(e) => {
                            error!(error = %e, "Concept catalog unavailable");
                            (None, unavailable(e))
                        }
                    }
                }
            },
        };

        let (vectors, vectors_state) = match deps.vectors {
            Some(vectors) => (Some(vectors), Availability::Ready),
            None => match &models_dir {
                None => (None, unavailable("models directory unknown")),
                Some(dir) => {
                    let path = dir.join(&config.vectors_file.0);
                    match WordVectors::load(&path) {
                        Ok(vectors) => {
                            info!(path = %path.display(), words = vectors.len(), "Word vectors loaded");
                            (Some(Arc::new(vectors) as SharedModel), Availability::Ready)
                        }
                        Err(e) => {
                            error!(path = %path.display(), error = %e, "Word vectors unavailable");
                            (None, unavailable(e))
                        }
                    }
                }
            },
        };

        let mut predictors: Vec<Arc<dyn Predictor>> = Vec::new();
        if let Some(catalog) = &catalog {
            predictors.push(Arc::new(CatalogPredictor::new(
                catalog.clone(),
                decompounder.clone(),
            )));
            if let Some(vectors) = vectors {
                let index = Arc::new(EmbeddingIndex::new(vectors, &config.embedding));
                predictors.push(Arc::new(EmbeddingPredictor::new(
                    catalog.clone(),
                    index,
                    analyzer.clone(),
                    decompounder.clone(),
                    config.embedding.nearest_k,
                )));
            }
        }
        predictors.push(Arc::new(HistoryPredictor::new(
            deps.history,
            deps.user,
            deps.layer,
            config.traits.max_rejects,
        )));

        let scorer = EnsembleScorer::new(predictors, config.traits.min_confidence);
        let embeddings = match (&catalog_state, vectors_state) {
            (Availability::Unavailable(_), Availability::Ready) => {
                unavailable("concept catalog unavailable")
            }
            (_, state) => state,
        };
        let status = EngineStatus {
            models_dir,
            catalog: catalog_state,
            embeddings,
            decompounding: decompounder.is_enabled(),
            predictors: scorer.predictor_names().iter().map(|n| n.to_string()).collect(),
        };
        if !status.catalog.is_ready() || !status.embeddings.is_ready() {
            warn!(predictors = ?status.predictors, "Running with a reduced predictor set");
        }

        Self {
            analyzer,
            catalog,
            scorer,
            status,
        }
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn catalog(&self) -> Option<&CatalogIndex> {
        self.catalog.as_deref()
    }

    pub fn scorer(&self) -> &EnsembleScorer {
        &self.scorer
    }

    /// The history predictor needs a trained co-occurrence model.
    pub fn requires_training(&self) -> bool {
        true
    }

    /// Learn the co-occurrence model from annotated documents and make the
    /// context ready for prediction.
    pub async fn train(
        &self,
        context: &RecommenderContext,
        documents: &[AnnotatedDocument],
    ) -> Result<()> {
        context.put_model(CoOccurrenceModel::learn(documents)).await?;
        context.mark_ready().await;
        Ok(())
    }

    /// Ranked candidates for one term, including suppressed ones.
    pub async fn suggest(&self, context: &RecommenderContext, term: &Term) -> Vec<Suggestion> {
        self.scorer.predict(context, term).await
    }

    /// Suggestions for every noun token, in token order and rank order
    /// within a token. Suppressed candidates are never emitted.
    pub async fn predict(&self, context: &RecommenderContext, tokens: &[Term]) -> Vec<LinkSuggestion> {
        let mut result = Vec::new();
        for token in tokens.iter().filter(|t| t.is_noun()) {
            let (begin, end) = token.span();
            for suggestion in self.scorer.predict(context, token).await {
                if suggestion.is_suppressed() {
                    continue;
                }
                result.push(LinkSuggestion {
                    begin,
                    end,
                    iri: suggestion.iri,
                    score: suggestion.score,
                    explanation: suggestion.explanation,
                });
            }
        }
        result
    }

    /// Analyze `text` and predict over its tokens
    pub async fn annotate(&self, context: &RecommenderContext, text: &str) -> Result<Vec<LinkSuggestion>> {
        let tokens = self.analyzer.analyze(text)?;
        Ok(self.predict(context, &tokens).await)
    }
}

fn build_decompounder(
    config: &LinkerConfig,
    splitter: Option<SharedSplitter>,
    analyzer: Arc<dyn NounAnalyzer>,
) -> TermDecompounder {
    if let Some(splitter) = splitter {
        return TermDecompounder::new(splitter, analyzer);
    }
    if !config.decompounder.enabled {
        return TermDecompounder::disabled(analyzer);
    }
    match HttpCompoundSplitter::new(&config.decompounder) {
        Ok(splitter) => TermDecompounder::new(Arc::new(splitter), analyzer),
        Err(e) => {
            warn!(error = %e, "Decompounding disabled");
            TermDecompounder::disabled(analyzer)
        }
    }
}

fn unavailable(reason: impl ToString) -> Availability {
    Availability::Unavailable(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PlainAnalyzer;
    use crate::predictor::MemoryHistoryStore;

    fn config() -> LinkerConfig {
        let mut config = LinkerConfig::default();
        config.decompounder.enabled = false;
        config.traits.min_confidence = 0.0;
        config
    }

    #[tokio::test]
    async fn test_missing_models_dir_degrades_to_history_only() {
        let mut config = config();
        config.models_dir = Some(PathBuf::from("/nonexistent/concept-linker/models"));
        let deps = LinkerDeps::new(
            Arc::new(PlainAnalyzer),
            Arc::new(MemoryHistoryStore::new()),
            "anna",
            "concept",
        );
        let linker = ConceptLinker::new(&config, deps).await;

        assert!(!linker.status().catalog.is_ready());
        assert!(!linker.status().embeddings.is_ready());
        assert_eq!(linker.scorer().len(), 1);
        assert!(linker.requires_training());

        let ctx = RecommenderContext::new();
        assert!(linker.suggest(&ctx, &Term::from_text("bil")).await.is_empty());
    }

    #[tokio::test]
    async fn test_train_makes_context_ready() {
        let deps = LinkerDeps::new(
            Arc::new(PlainAnalyzer),
            Arc::new(MemoryHistoryStore::new()),
            "anna",
            "concept",
        )
        .with_catalog(CatalogIndex::new());
        let linker = ConceptLinker::new(&config(), deps).await;
        let ctx = RecommenderContext::new();

        let docs = vec![AnnotatedDocument::new("en bil").with_label("bil", "X1")];
        linker.train(&ctx, &docs).await.unwrap();
        assert!(ctx.is_ready().await);

        let suggestions = linker.annotate(&ctx, "En bil").await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].iri, "X1");
        assert_eq!((suggestions[0].begin, suggestions[0].end), (3, 6));
        assert!((suggestions[0].score - 0.5).abs() < 1e-12);
    }
}
