//! Core data types shared by the catalog, predictors and ensemble

use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Concept identifier in the target vocabulary
pub type Iri = String;

/// Per-IRI scores produced by one predictor
pub type ScoreMap = HashMap<Iri, f64>;

/// POS tags denoting noun subtypes (Talbanken76, as emitted by the Swedish
/// OpenNLP tagger): proper, meta, adjectival, verbal and common nouns.
pub const NOUN_TAGS: &[&str] = &["PN", "MN", "AN", "VN", "NN"];

// =============================================================================
// Term
// =============================================================================

/// A word occurrence in a document.
///
/// Equality ignores the POS tag so that alternate noun-subtype taggings of
/// the same span compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    text: String,
    stem: String,
    pos: String,
    begin: usize,
    end: usize,
}

impl Term {
    pub fn new(
        text: impl Into<String>,
        stem: impl Into<String>,
        pos: impl Into<String>,
        begin: usize,
        end: usize,
    ) -> Self {
        Self {
            text: text.into(),
            stem: stem.into().to_lowercase(),
            pos: pos.into(),
            begin,
            end,
        }
    }

    /// Term whose stem is its own text and which carries no tag or span.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.len();
        Self::new(text.clone(), text, "", 0, len)
    }

    /// Surface text as it appears in the document
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lowercased surface text, the key used by the co-occurrence model
    pub fn lookup_text(&self) -> String {
        self.text.to_lowercase()
    }

    /// Lowercased stem
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn pos(&self) -> &str {
        &self.pos
    }

    pub fn span(&self) -> (usize, usize) {
        (self.begin, self.end)
    }

    pub fn is_noun(&self) -> bool {
        NOUN_TAGS.contains(&self.pos.as_str())
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.stem == other.stem
            && self.text == other.text
            && self.begin == other.begin
            && self.end == other.end
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stem.hash(state);
        self.text.hash(state);
        self.begin.hash(state);
        self.end.hash(state);
    }
}

// =============================================================================
// ConceptRecord
// =============================================================================

/// One concept of the controlled vocabulary, as indexed by the catalog.
///
/// Identity is {IRI, name, definition, synonyms}; `table`, `code` and the
/// derived noun stems are descriptive only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub iri: Iri,
    pub name: Option<String>,
    pub definition: Option<String>,
    pub table: Option<String>,
    pub code: Option<String>,
    pub synonyms: Vec<String>,
    pub nouns: BTreeSet<String>,
}

impl ConceptRecord {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            ..Default::default()
        }
    }

    /// Record a synonym; synonyms are also indexing nouns.
    pub fn add_synonym(&mut self, synonym: &str) {
        self.synonyms.push(synonym.to_string());
        self.nouns.insert(synonym.to_lowercase());
    }

    pub fn add_noun(&mut self, noun: &str) {
        self.nouns.insert(noun.to_lowercase());
    }

    /// Sentence-cased "Name. Definition." text fed to noun extraction.
    pub fn text(&self) -> String {
        let mut result = String::new();
        if let Some(name) = self.name.as_deref().and_then(sentence_case) {
            result.push_str(&name);
            result.push('.');
        }
        if let Some(definition) = self.definition.as_deref().and_then(sentence_case) {
            result.push(' ');
            result.push_str(&definition);
            result.push('.');
        }
        result
    }
}

impl PartialEq for ConceptRecord {
    fn eq(&self, other: &Self) -> bool {
        self.iri == other.iri
            && self.name == other.name
            && self.definition == other.definition
            && self.synonyms == other.synonyms
    }
}

impl Eq for ConceptRecord {}

impl Hash for ConceptRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.iri.hash(state);
        self.name.hash(state);
        self.definition.hash(state);
        self.synonyms.hash(state);
    }
}

fn sentence_case(s: &str) -> Option<String> {
    let mut chars = s.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

// =============================================================================
// History
// =============================================================================

/// Annotator decision on a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
}

/// One accept/reject event recorded by the history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub term: String,
    pub iri: Iri,
    pub decision: Decision,
    pub layer: String,
}
