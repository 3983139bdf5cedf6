//! Vocabulary source: where catalog concepts come from

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LinkerError, Result};

/// A concept as listed by the vocabulary store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptEntry {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Attribute statements, when the export inlines them
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A (property, value) statement attached to a concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub property: String,
    pub value: String,
}

impl Attribute {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Read access to the controlled vocabulary, used only while building the
/// catalog.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn list_concepts(&self) -> Result<Vec<ConceptEntry>>;

    async fn list_attributes(&self, concept: &ConceptEntry) -> Result<Vec<Attribute>>;
}

/// Vocabulary exported as a JSON array of concept entries with inline
/// attributes.
#[derive(Debug, Clone, Default)]
pub struct JsonVocabulary {
    entries: Vec<ConceptEntry>,
}

impl JsonVocabulary {
    pub fn from_entries(entries: Vec<ConceptEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: Vec<ConceptEntry> = serde_json::from_str(content)
            .map_err(|e| LinkerError::Vocabulary(format!("malformed vocabulary export: {e}")))?;
        Ok(Self { entries })
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LinkerError::Vocabulary(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VocabularySource for JsonVocabulary {
    async fn list_concepts(&self) -> Result<Vec<ConceptEntry>> {
        Ok(self.entries.clone())
    }

    async fn list_attributes(&self, concept: &ConceptEntry) -> Result<Vec<Attribute>> {
        Ok(concept.attributes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"identifier": "urn:cc:1", "name": "dörr", "description": "öppning i vägg",
             "attributes": [{"property": "code", "value": "QQA"}]},
            {"identifier": "urn:cc:2"}
        ]"#;
        let vocab = JsonVocabulary::from_json(json).unwrap();
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.entries[0].attributes[0], Attribute::new("code", "QQA"));
        assert!(vocab.entries[1].name.is_none());
    }

    #[test]
    fn test_malformed_json() {
        let err = JsonVocabulary::from_json("{not json").unwrap_err();
        assert!(matches!(err, LinkerError::Vocabulary(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = JsonVocabulary::from_file(Path::new("/nonexistent/vocab.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, LinkerError::Vocabulary(_)));
    }
}
