//! Embedding similarity: word vectors plus memoized queries over them

pub mod index;
pub mod vectors;

pub use index::{EmbeddingIndex, SharedModel};
pub use vectors::{l2_norm, normalize, WordVectorModel, WordVectors, VECTORS_VERSION};
