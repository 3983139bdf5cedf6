//! Concept catalog index: stem → concept records
//!
//! Built once per process from the vocabulary and serialized to disk with
//! bincode. Read-only after construction; share it behind an `Arc`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LinkerError, Result};
use crate::types::ConceptRecord;

/// Snapshot format version - increment when struct layout changes
pub const CATALOG_VERSION: u32 = 1;

/// Position of a record within the catalog
pub type RecordId = usize;

/// In-memory lookup table from noun stem to the concepts mentioning it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogIndex {
    /// Format version for bincode compatibility
    version: u32,

    /// All indexed concepts
    records: Vec<ConceptRecord>,

    /// Stem lookup: lowercased noun stem → record ids (never empty)
    stems: HashMap<String, Vec<RecordId>>,

    /// Records sharing an IRI, for merging during build
    #[serde(skip)]
    by_iri: HashMap<String, Vec<RecordId>>,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self {
            version: CATALOG_VERSION,
            records: Vec::new(),
            stems: HashMap::new(),
            by_iri: HashMap::new(),
        }
    }

    /// Build an index directly from records, indexing each under its nouns.
    pub fn from_records(records: impl IntoIterator<Item = ConceptRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Add a record and index it under every one of its noun stems.
    ///
    /// A record equal to one already present is merged into it instead.
    pub fn insert(&mut self, record: ConceptRecord) -> RecordId {
        let records = &self.records;
        let same_iri = self.by_iri.entry(record.iri.clone()).or_default();
        let existing = same_iri.iter().copied().find(|id| records[*id] == record);
        let id = match existing {
            Some(existing) => {
                self.records[existing].nouns.extend(record.nouns);
                existing
            }
            None => {
                let id = self.records.len();
                same_iri.push(id);
                self.records.push(record);
                id
            }
        };

        let nouns: Vec<String> = self.records[id].nouns.iter().cloned().collect();
        for noun in nouns {
            let ids = self.stems.entry(noun).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        id
    }

    /// Record ids indexed under a stem (empty slice on a miss)
    pub fn hits(&self, stem: &str) -> &[RecordId] {
        self.stems.get(stem).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records indexed under a stem
    pub fn lookup(&self, stem: &str) -> impl Iterator<Item = &ConceptRecord> + '_ {
        self.hits(stem).iter().map(move |id| &self.records[*id])
    }

    pub fn contains_stem(&self, stem: &str) -> bool {
        self.stems.contains_key(stem)
    }

    pub fn record(&self, id: RecordId) -> Option<&ConceptRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &[ConceptRecord] {
        &self.records
    }

    pub fn stems(&self) -> impl Iterator<Item = &str> + '_ {
        self.stems.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Load snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut index: Self =
            bincode::deserialize(&bytes).map_err(|e| LinkerError::SnapshotCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if index.version != CATALOG_VERSION {
            return Err(LinkerError::SnapshotVersion {
                path: path.to_path_buf(),
                expected: CATALOG_VERSION,
                found: index.version,
            });
        }

        index.check(path)?;
        for (id, record) in index.records.iter().enumerate() {
            index.by_iri.entry(record.iri.clone()).or_default().push(id);
        }
        Ok(index)
    }

    /// Save snapshot to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }

    fn check(&self, path: &Path) -> Result<()> {
        for (stem, ids) in &self.stems {
            if ids.is_empty() || ids.iter().any(|id| *id >= self.records.len()) {
                return Err(LinkerError::SnapshotCorrupt {
                    path: path.to_path_buf(),
                    reason: format!("invalid record list for stem '{stem}'"),
                });
            }
        }
        Ok(())
    }

    /// Statistics for debugging
    pub fn stats(&self) -> CatalogStats {
        let refs: Vec<usize> = self.stems.values().map(Vec::len).collect();
        CatalogStats {
            version: self.version,
            record_count: self.records.len(),
            stem_count: self.stems.len(),
            total_references: refs.iter().sum(),
            max_references: refs.iter().copied().max().unwrap_or(0),
        }
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub version: u32,
    pub record_count: usize,
    pub stem_count: usize,
    pub total_references: usize,
    pub max_references: usize,
}

impl std::fmt::Display for CatalogStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Concept Catalog Statistics:")?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Concepts: {}", self.record_count)?;
        writeln!(f, "  Stems: {}", self.stem_count)?;
        writeln!(f, "  References: {}", self.total_references)?;
        writeln!(f, "  Max references per stem: {}", self.max_references)?;
        Ok(())
    }
}
