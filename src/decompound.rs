//! Term decompounding
//!
//! Compound words ("ytterdörrsbeslag") are split by an external service into
//! sub-words, which are re-analyzed into terms. Service answers are memoized
//! for the life of the process and concurrent lookups of one word share a
//! single request; transport failures are not memoized so a service that
//! comes back is used again.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

use crate::analysis::NounAnalyzer;
use crate::config::DecompounderConfig;
use crate::error::{LinkerError, Result};
use crate::types::Term;

/// External compound-splitting service
#[async_trait]
pub trait CompoundSplitter: Send + Sync {
    /// Split a word into components.
    ///
    /// `Ok(None)` means the service answered but the word is not a compound.
    async fn split(&self, word: &str) -> Result<Option<Vec<String>>>;
}

/// Shared splitter type
pub type SharedSplitter = Arc<dyn CompoundSplitter>;

/// HTTP client for a SECOS-style splitter: `GET <url>?sentence=<word>`
/// answering with the components separated by spaces.
pub struct HttpCompoundSplitter {
    client: reqwest::Client,
    url: String,
}

impl HttpCompoundSplitter {
    pub fn new(config: &DecompounderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.connect_timeout() + config.read_timeout())
            .build()
            .map_err(|e| LinkerError::Config(format!("cannot build decompounder client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompoundSplitter for HttpCompoundSplitter {
    async fn split(&self, word: &str) -> Result<Option<Vec<String>>> {
        let to_err = |e: reqwest::Error| LinkerError::Decompound {
            word: word.to_string(),
            reason: e.to_string(),
        };

        let body = self
            .client
            .get(&self.url)
            .query(&[("sentence", word)])
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?
            .text()
            .await
            .map_err(to_err)?;

        Ok(parse_components(&body))
    }
}

/// Parse a splitter response; a single token (or nothing) is not a split.
pub fn parse_components(body: &str) -> Option<Vec<String>> {
    let trimmed = body.trim();
    if !trimmed.contains(char::is_whitespace) {
        return None;
    }
    Some(trimmed.split_whitespace().map(str::to_string).collect())
}

type Components = Option<Vec<String>>;

/// Memoizing decompounder producing re-analyzed sub-terms
pub struct TermDecompounder {
    splitter: Option<SharedSplitter>,
    analyzer: Arc<dyn NounAnalyzer>,
    cache: RwLock<HashMap<String, Arc<OnceCell<Components>>>>,
}

impl TermDecompounder {
    pub fn new(splitter: SharedSplitter, analyzer: Arc<dyn NounAnalyzer>) -> Self {
        Self {
            splitter: Some(splitter),
            analyzer,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Decompounder that never splits (service disabled)
    pub fn disabled(analyzer: Arc<dyn NounAnalyzer>) -> Self {
        Self {
            splitter: None,
            analyzer,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.splitter.is_some()
    }

    /// Split a term into analyzed sub-terms.
    ///
    /// Returns an empty list when the term cannot be decompounded for any
    /// reason; sub-words that fail re-analysis are dropped.
    pub async fn decompound(&self, term: &Term) -> Vec<Term> {
        let word = term.lookup_text();
        let Some(components) = self.components(&word).await else {
            return Vec::new();
        };

        components
            .iter()
            .filter_map(|c| self.analyzer.analyze_word(&c.to_lowercase()))
            .collect()
    }

    async fn components(&self, word: &str) -> Option<Vec<String>> {
        let splitter = self.splitter.as_ref()?;
        if word.trim().is_empty() {
            return None;
        }

        let existing = self.cache.read().await.get(word).cloned();
        let cell = match existing {
            Some(cell) => cell,
            None => self
                .cache
                .write()
                .await
                .entry(word.to_string())
                .or_default()
                .clone(),
        };

        let answer = cell
            .get_or_try_init(|| async {
                let components = splitter.split(word).await?;
                debug!(word, ?components, "Decompounded");
                Ok::<_, LinkerError>(components)
            })
            .await;

        match answer {
            Ok(components) => components.clone(),
            Err(e) => {
                warn!(word, error = %e, "Could not decompound");
                None
            }
        }
    }

    /// Number of memoized words
    pub async fn cached_len(&self) -> usize {
        self.cache
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}
