//! Co-occurrence model learned from previously annotated documents
//!
//! Maps lowercased covered text to the IRIs annotators attached to it, with
//! occurrence counts. Counts are always at least one; a term missing from the
//! model has never been annotated.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::types::Iri;

/// IRI → occurrence count for one term
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IriFrequency {
    entries: BTreeMap<Iri, u32>,
}

impl IriFrequency {
    pub fn new(iri: impl Into<Iri>) -> Self {
        let mut frequency = Self::default();
        frequency.add(iri);
        frequency
    }

    pub fn add(&mut self, iri: impl Into<Iri>) {
        *self.entries.entry(iri.into()).or_insert(0) += 1;
    }

    pub fn entries(&self) -> &BTreeMap<Iri, u32> {
        &self.entries
    }

    pub fn distinct_iris(&self) -> usize {
        self.entries.len()
    }

    pub fn count(&self, iri: &str) -> u32 {
        self.entries.get(iri).copied().unwrap_or(0)
    }
}

/// An annotation span with its (possibly empty) concept label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledSpan {
    pub begin: usize,
    pub end: usize,
    #[serde(default)]
    pub iri: Option<Iri>,
}

/// A document with the concept annotations made on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<LabelledSpan>,
}

impl AnnotatedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            annotations: Vec::new(),
        }
    }

    /// Label the first occurrence of `needle` with `iri`.
    pub fn with_label(mut self, needle: &str, iri: impl Into<Iri>) -> Self {
        if let Some(begin) = self.text.find(needle) {
            self.annotations.push(LabelledSpan {
                begin,
                end: begin + needle.len(),
                iri: Some(iri.into()),
            });
        }
        self
    }

    /// Covered text of a span; `None` if the span does not fall on
    /// character boundaries of the document.
    pub fn covered_text(&self, span: &LabelledSpan) -> Option<&str> {
        self.text.get(span.begin..span.end)
    }

    /// Load a JSON array of annotated documents
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        let documents: Vec<Self> = serde_json::from_str(&content)?;
        Ok(documents)
    }
}

/// Lowercased term → IRI frequencies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrenceModel {
    terms: HashMap<String, IriFrequency>,
}

impl CoOccurrenceModel {
    /// Count every labelled annotation in `documents`, keyed by its covered
    /// text lowercased. Spans without a label are skipped.
    pub fn learn(documents: &[AnnotatedDocument]) -> Self {
        let mut model = Self::default();
        let mut learned = 0usize;

        for document in documents {
            for span in &document.annotations {
                let Some(iri) = span.iri.as_deref().filter(|i| !i.is_empty()) else {
                    continue;
                };
                let Some(text) = document.covered_text(span) else {
                    continue;
                };
                model.record(text, iri);
                learned += 1;
            }
        }

        info!(
            documents = documents.len(),
            annotations = learned,
            terms = model.len(),
            "Co-occurrence model learned"
        );
        model
    }

    pub fn record(&mut self, term: &str, iri: &str) {
        self.terms
            .entry(term.to_lowercase())
            .and_modify(|f| f.add(iri))
            .or_insert_with(|| IriFrequency::new(iri));
    }

    /// Frequencies for a term, matched case-insensitively
    pub fn get(&self, term: &str) -> Option<&IriFrequency> {
        self.terms.get(&term.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
