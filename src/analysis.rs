//! Noun analysis seam
//!
//! Segmentation, tagging and stemming happen outside this crate. The
//! `NounAnalyzer` trait is the boundary: given text it yields terms with a
//! surface form, a stem, a POS tag and a byte span.
//!
//! `PlainAnalyzer` is the fallback used when no tagger is wired in: every
//! alphabetic token is treated as a common noun and its stem is the
//! normalized, lowercased surface form.

use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::types::Term;

/// Tag assigned by `PlainAnalyzer` to alphabetic tokens
pub const PLAIN_NOUN_TAG: &str = "NN";

/// Tag assigned by `PlainAnalyzer` to everything else
pub const PLAIN_OTHER_TAG: &str = "XX";

/// Text analysis pipeline producing tagged, stemmed terms.
pub trait NounAnalyzer: Send + Sync {
    /// Analyze a text into terms, in document order.
    fn analyze(&self, text: &str) -> Result<Vec<Term>>;

    /// Re-analyze a single word, returning its first term.
    ///
    /// Failures and empty analyses both yield `None`.
    fn analyze_word(&self, word: &str) -> Option<Term> {
        match self.analyze(word) {
            Ok(terms) => terms.into_iter().next(),
            Err(e) => {
                tracing::debug!(word, error = %e, "Word analysis failed");
                None
            }
        }
    }
}

/// Tagger-free analyzer: NFKC fold, split on non-alphanumerics, lowercase stem.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainAnalyzer;

impl PlainAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl NounAnalyzer for PlainAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Term>> {
        let mut terms = Vec::new();
        let mut start: Option<usize> = None;

        for (idx, c) in text.char_indices() {
            if c.is_alphanumeric() {
                if start.is_none() {
                    start = Some(idx);
                }
            } else if let Some(begin) = start.take() {
                terms.push(plain_term(&text[begin..idx], begin, idx));
            }
        }
        if let Some(begin) = start {
            terms.push(plain_term(&text[begin..], begin, text.len()));
        }

        Ok(terms)
    }
}

fn plain_term(surface: &str, begin: usize, end: usize) -> Term {
    let stem: String = surface.nfkc().collect::<String>().to_lowercase();
    let pos = if surface.chars().all(char::is_alphabetic) {
        PLAIN_NOUN_TAG
    } else {
        PLAIN_OTHER_TAG
    };
    Term::new(surface, stem, pos, begin, end)
}
