//! Catalog construction from a vocabulary source
//!
//! Architecture:
//!
//! ```text
//!   VocabularySource.list_concepts()
//!       │
//!       ├─► list_attributes()  → dimension / code / synonym
//!       │
//!       ├─► NounAnalyzer("Name. Definition.") → noun stems
//!       │
//!       ▼
//!   CatalogIndex (stem → records) ──save──► <models>/coclass-lookup.bin
//! ```

use std::path::Path;

use tracing::{debug, info, warn};

use super::index::CatalogIndex;
use super::source::{Attribute, ConceptEntry, VocabularySource};
use crate::analysis::NounAnalyzer;
use crate::error::{LinkerError, Result};
use crate::types::ConceptRecord;

const PROGRESS_EVERY: usize = 100;

/// Builds the catalog index from vocabulary entries
pub struct CatalogBuilder<'a> {
    analyzer: &'a dyn NounAnalyzer,
}

impl<'a> CatalogBuilder<'a> {
    pub fn new(analyzer: &'a dyn NounAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Build a fresh index. Source failures surface as `CatalogBuild`.
    pub async fn build(&self, source: &dyn VocabularySource) -> Result<CatalogIndex> {
        let concepts = source
            .list_concepts()
            .await
            .map_err(|e| LinkerError::CatalogBuild(format!("cannot list concepts: {e}")))?;

        let total = concepts.len();
        let mut index = CatalogIndex::new();

        for (i, concept) in concepts.iter().enumerate() {
            let attributes = source.list_attributes(concept).await.map_err(|e| {
                LinkerError::CatalogBuild(format!(
                    "cannot list attributes of {}: {e}",
                    concept.identifier
                ))
            })?;

            let record = self.analyze_concept(concept, &attributes);
            index.insert(record);

            if (i + 1) % PROGRESS_EVERY == 0 || i + 1 == total {
                info!("Analyzed {}/{} concepts", i + 1, total);
            }
        }

        Ok(index)
    }

    /// Turn one vocabulary entry into an indexed record.
    pub fn analyze_concept(&self, concept: &ConceptEntry, attributes: &[Attribute]) -> ConceptRecord {
        let mut record = ConceptRecord::new(&concept.identifier);
        record.name = concept.name.clone();
        record.definition = concept.description.clone();

        for attribute in attributes {
            if attribute.value.is_empty() {
                continue;
            }
            match attribute.property.as_str() {
                "dimension" => record.table = Some(attribute.value.clone()),
                "code" => record.code = Some(attribute.value.clone()),
                "synonym" => record.add_synonym(&attribute.value),
                _ => {}
            }
        }

        let text = record.text();
        match self.analyzer.analyze(&text) {
            Ok(terms) => {
                for term in terms.iter().filter(|t| t.is_noun()) {
                    record.add_noun(term.stem());
                }
            }
            Err(e) => warn!(iri = %record.iri, error = %e, "Noun extraction failed"),
        }

        debug!(iri = %record.iri, nouns = record.nouns.len(), "Concept analyzed");
        record
    }
}

/// Load the catalog snapshot at `path`, or build it from `source` and
/// persist it there.
///
/// A corrupt or outdated snapshot is rebuilt when a source is available.
pub async fn load_or_build(
    path: &Path,
    source: Option<&dyn VocabularySource>,
    analyzer: &dyn NounAnalyzer,
) -> Result<CatalogIndex> {
    if path.exists() {
        match CatalogIndex::load(path) {
            Ok(index) => {
                info!(path = %path.display(), concepts = index.len(), "Using existing concept lookup file");
                return Ok(index);
            }
            Err(e @ (LinkerError::SnapshotCorrupt { .. } | LinkerError::SnapshotVersion { .. }))
                if source.is_some() =>
            {
                warn!(error = %e, "Discarding concept lookup file, rebuilding");
            }
            Err(e) => return Err(e),
        }
    }

    let source = source.ok_or_else(|| {
        LinkerError::CatalogBuild(format!(
            "no lookup file at {} and no vocabulary source configured",
            path.display()
        ))
    })?;

    info!(path = %path.display(), "Generating concept lookup file...");
    let index = CatalogBuilder::new(analyzer).build(source).await?;

    if let Err(e) = index.save(path) {
        warn!(path = %path.display(), error = %e, "Could not persist concept lookup file");
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PlainAnalyzer;
    use crate::catalog::source::JsonVocabulary;
    use async_trait::async_trait;

    fn entry(id: &str, name: &str, description: &str, attributes: Vec<Attribute>) -> ConceptEntry {
        ConceptEntry {
            identifier: id.to_string(),
            name: Some(name.to_string()),
            description: Some(description.to_string()),
            attributes,
        }
    }

    struct UnreachableVocabulary;

    #[async_trait]
    impl VocabularySource for UnreachableVocabulary {
        async fn list_concepts(&self) -> Result<Vec<ConceptEntry>> {
            Err(LinkerError::Vocabulary("connection refused".into()))
        }

        async fn list_attributes(&self, _concept: &ConceptEntry) -> Result<Vec<Attribute>> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_attribute_classification() {
        let analyzer = PlainAnalyzer;
        let builder = CatalogBuilder::new(&analyzer);
        let concept = entry(
            "urn:cc:1",
            "ytterdörr",
            "dörr i yttervägg",
            vec![],
        );
        let attributes = vec![
            Attribute::new("dimension", "Komponenter"),
            Attribute::new("code", "QQA"),
            Attribute::new("synonym", "Entrédörr"),
            Attribute::new("color", "röd"),
            Attribute::new("synonym", ""),
        ];

        let record = builder.analyze_concept(&concept, &attributes);
        assert_eq!(record.table.as_deref(), Some("Komponenter"));
        assert_eq!(record.code.as_deref(), Some("QQA"));
        assert_eq!(record.synonyms, vec!["Entrédörr".to_string()]);
        assert!(record.nouns.contains("entrédörr"));
        assert!(record.nouns.contains("ytterdörr"));
        assert!(record.nouns.contains("yttervägg"));
        assert!(!record.nouns.contains("röd"));
    }

    #[tokio::test]
    async fn test_build_indexes_every_noun() {
        let vocab = JsonVocabulary::from_entries(vec![
            entry("X1", "katt", "", vec![]),
            entry("X2", "hund", "katt", vec![]),
        ]);
        let index = CatalogBuilder::new(&PlainAnalyzer).build(&vocab).await.unwrap();

        let katt: Vec<&str> = index.lookup("katt").map(|r| r.iri.as_str()).collect();
        assert_eq!(katt, vec!["X1", "X2"]);
        let hund: Vec<&str> = index.lookup("hund").map(|r| r.iri.as_str()).collect();
        assert_eq!(hund, vec!["X2"]);
    }

    #[tokio::test]
    async fn test_unreachable_source_is_build_error() {
        let err = CatalogBuilder::new(&PlainAnalyzer)
            .build(&UnreachableVocabulary)
            .await
            .unwrap_err();
        assert!(matches!(err, LinkerError::CatalogBuild(_)));
    }

    #[tokio::test]
    async fn test_load_or_build_persists_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coclass-lookup.bin");
        let vocab = JsonVocabulary::from_entries(vec![entry("X1", "katt", "", vec![])]);

        let built = load_or_build(&path, Some(&vocab), &PlainAnalyzer).await.unwrap();
        assert!(path.exists());

        // Second construction must not touch the source
        let reused = load_or_build(&path, Some(&UnreachableVocabulary), &PlainAnalyzer)
            .await
            .unwrap();
        assert_eq!(built, reused);
    }

    #[tokio::test]
    async fn test_load_or_build_rebuilds_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coclass-lookup.bin");
        std::fs::write(&path, b"garbage").unwrap();
        let vocab = JsonVocabulary::from_entries(vec![entry("X1", "katt", "", vec![])]);

        let index = load_or_build(&path, Some(&vocab), &PlainAnalyzer).await.unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(CatalogIndex::load(&path).unwrap(), index);
    }

    #[tokio::test]
    async fn test_load_or_build_without_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coclass-lookup.bin");
        let err = load_or_build(&path, None, &PlainAnalyzer).await.unwrap_err();
        assert!(matches!(err, LinkerError::CatalogBuild(_)));
    }
}
