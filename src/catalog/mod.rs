//! Concept catalog: vocabulary concepts indexed by noun stem
//!
//! The catalog is the lookup table shared by the catalog-frequency and
//! embedding-similarity predictors. It is built once from the vocabulary
//! store, persisted as a bincode snapshot, and reused on later startups.

pub mod builder;
pub mod index;
pub mod source;

pub use builder::{load_or_build, CatalogBuilder};
pub use index::{CatalogIndex, CatalogStats, RecordId, CATALOG_VERSION};
pub use source::{Attribute, ConceptEntry, JsonVocabulary, VocabularySource};
