//! Pre-trained word vectors
//!
//! Loaded once from the word2vec text format and kept as a bincode snapshot
//! in the models directory. Vectors are unit-normalized on load so cosine
//! similarity is a dot product.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LinkerError, Result};

/// Snapshot format version - increment when struct layout changes
pub const VECTORS_VERSION: u32 = 1;

/// Queries answered by a word-embedding model
pub trait WordVectorModel: Send + Sync {
    /// The `k` words closest to `word`, most similar first, excluding
    /// `word` itself. Unknown words have no neighbours.
    fn nearest(&self, word: &str, k: usize) -> Vec<String>;

    /// Cosine similarity in [-1, 1]; `None` if either word is unknown.
    fn similarity(&self, a: &str, b: &str) -> Option<f64>;
}

/// L2 norm of a vector
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize vector to unit length
pub fn normalize(v: Vec<f32>) -> Vec<f32> {
    let n = l2_norm(&v);
    if n > 0.0 {
        v.into_iter().map(|x| x / n).collect()
    } else {
        v
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Dense word-vector table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordVectors {
    version: u32,
    dim: usize,
    words: Vec<String>,
    vectors: Vec<Vec<f32>>,
    #[serde(skip)]
    lookup: HashMap<String, usize>,
}

impl WordVectors {
    /// Build from (word, vector) pairs. Later duplicates are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Vec<f32>)>) -> Result<Self> {
        let mut words = Vec::new();
        let mut vectors = Vec::new();
        let mut lookup = HashMap::new();
        let mut dim = None;

        for (word, vector) in pairs {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(LinkerError::ModelLoad(format!(
                    "vector for '{word}' has {} dimensions, expected {expected}",
                    vector.len()
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(LinkerError::ModelLoad(format!(
                    "vector for '{word}' has a non-finite component"
                )));
            }
            if lookup.contains_key(&word) {
                continue;
            }
            lookup.insert(word.clone(), words.len());
            words.push(word);
            vectors.push(normalize(vector));
        }

        Ok(Self {
            version: VECTORS_VERSION,
            dim: dim.unwrap_or(0),
            words,
            vectors,
            lookup,
        })
    }

    /// Parse the word2vec text format. The `<count> <dim>` header line is
    /// optional.
    pub fn from_word2vec_text(reader: impl BufRead) -> Result<Self> {
        let mut pairs = Vec::new();
        let mut declared: Option<(usize, usize)> = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let rest: Vec<&str> = fields.collect();

            if line_no == 0 && rest.len() == 1 {
                if let (Ok(count), Ok(dim)) = (word.parse::<usize>(), rest[0].parse::<usize>()) {
                    declared = Some((count, dim));
                    continue;
                }
            }

            let vector = rest
                .iter()
                .map(|f| f.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    LinkerError::ModelLoad(format!("line {}: bad component: {e}", line_no + 1))
                })?;

            if let Some((_, dim)) = declared {
                if vector.len() != dim {
                    return Err(LinkerError::ModelLoad(format!(
                        "line {}: expected {dim} components, found {}",
                        line_no + 1,
                        vector.len()
                    )));
                }
            }
            pairs.push((word.to_string(), vector));
        }

        let vectors = Self::from_pairs(pairs)?;
        if let Some((count, _)) = declared {
            if count != vectors.len() {
                warn!(
                    declared = count,
                    loaded = vectors.len(),
                    "Word count differs from header"
                );
            }
        }
        Ok(vectors)
    }

    pub fn from_word2vec_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let vectors = Self::from_word2vec_text(std::io::BufReader::new(file))?;
        info!(path = %path.display(), words = vectors.len(), dim = vectors.dim, "Word vectors parsed");
        Ok(vectors)
    }

    /// Load snapshot from disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut vectors: Self =
            bincode::deserialize(&bytes).map_err(|e| LinkerError::SnapshotCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if vectors.version != VECTORS_VERSION {
            return Err(LinkerError::SnapshotVersion {
                path: path.to_path_buf(),
                expected: VECTORS_VERSION,
                found: vectors.version,
            });
        }
        if vectors.words.len() != vectors.vectors.len() {
            return Err(LinkerError::SnapshotCorrupt {
                path: path.to_path_buf(),
                reason: "word and vector counts differ".to_string(),
            });
        }
        if let Some(i) = vectors
            .vectors
            .iter()
            .position(|v| v.len() != vectors.dim || v.iter().any(|x| !x.is_finite()))
        {
            return Err(LinkerError::SnapshotCorrupt {
                path: path.to_path_buf(),
                reason: format!("malformed vector for '{}'", vectors.words[i]),
            });
        }

        vectors.lookup = vectors
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        Ok(vectors)
    }

    /// Save snapshot to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup.contains_key(word)
    }

    fn vector(&self, word: &str) -> Option<&[f32]> {
        self.lookup.get(word).map(|i| self.vectors[*i].as_slice())
    }
}

impl WordVectorModel for WordVectors {
    fn nearest(&self, word: &str, k: usize) -> Vec<String> {
        let Some(&own) = self.lookup.get(word) else {
            return Vec::new();
        };
        let query = &self.vectors[own];

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .par_iter()
            .enumerate()
            .filter(|(i, _)| *i != own)
            .map(|(i, v)| (dot(query, v), i))
            .collect();

        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| self.words[a.1].cmp(&self.words[b.1]))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(_, i)| self.words[i].clone())
            .collect()
    }

    fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        let va = self.vector(a)?;
        let vb = self.vector(b)?;
        let similarity = dot(va, vb) as f64;
        similarity.is_finite().then(|| similarity.clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WordVectors {
        WordVectors::from_pairs(vec![
            ("katt".to_string(), vec![1.0, 0.0, 0.0]),
            ("kisse".to_string(), vec![0.9, 0.1, 0.0]),
            ("hund".to_string(), vec![0.6, 0.8, 0.0]),
            ("bil".to_string(), vec![0.0, 0.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_normalize() {
        let v = normalize(vec![3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_nearest_excludes_self_and_orders() {
        let vectors = sample();
        assert_eq!(vectors.nearest("katt", 2), vec!["kisse", "hund"]);
        assert_eq!(vectors.nearest("katt", 10).len(), 3);
        assert!(vectors.nearest("okänd", 3).is_empty());
    }

    #[test]
    fn test_nearest_ties_ordered_by_word() {
        let vectors = WordVectors::from_pairs(vec![
            ("q".to_string(), vec![1.0, 0.0]),
            ("vägg".to_string(), vec![1.0, 1.0]),
            ("dörr".to_string(), vec![1.0, 1.0]),
            ("tak".to_string(), vec![0.0, 1.0]),
        ])
        .unwrap();
        assert_eq!(vectors.nearest("q", 3), vec!["dörr", "vägg", "tak"]);
    }

    #[test]
    fn test_similarity() {
        let vectors = sample();
        let s = vectors.similarity("katt", "hund").unwrap();
        assert!((s - 0.6).abs() < 1e-6);
        assert_eq!(vectors.similarity("katt", "bil"), Some(0.0));
        assert!(vectors.similarity("katt", "okänd").is_none());
        let same = vectors.similarity("hund", "hund").unwrap();
        assert!((same - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_word2vec_text_with_header() {
        let text = "3 2\nkatt 1 0\nhund 0.6 0.8\nbil 0 1\n";
        let vectors = WordVectors::from_word2vec_text(text.as_bytes()).unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors.dim(), 2);
        assert!(vectors.contains("hund"));
    }

    #[test]
    fn test_word2vec_text_without_header() {
        let text = "katt 1 0\nhund 0.6 0.8\n";
        let vectors = WordVectors::from_word2vec_text(text.as_bytes()).unwrap();
        assert_eq!(vectors.len(), 2);
    }

    #[test]
    fn test_word2vec_text_dimension_mismatch() {
        let text = "2 2\nkatt 1 0\nhund 0.6\n";
        let err = WordVectors::from_word2vec_text(text.as_bytes()).unwrap_err();
        assert!(matches!(err, LinkerError::ModelLoad(_)));
    }

    #[test]
    fn test_word2vec_text_rejects_non_finite() {
        let text = "q 1 0\nbil nan nan\n";
        let err = WordVectors::from_word2vec_text(text.as_bytes()).unwrap_err();
        assert!(matches!(err, LinkerError::ModelLoad(_)));

        let text = "q 1 0\nbil inf 0\n";
        assert!(WordVectors::from_word2vec_text(text.as_bytes()).is_err());
    }

    #[test]
    fn test_load_rejects_non_finite_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word2vec-sv.bin");
        let mut vectors = sample();
        vectors.vectors[3] = vec![f32::NAN, 0.0, 0.0];
        std::fs::write(&path, bincode::serialize(&vectors).unwrap()).unwrap();

        let err = WordVectors::load(&path).unwrap_err();
        assert!(matches!(err, LinkerError::SnapshotCorrupt { .. }));
    }

    #[test]
    fn test_snapshot_round_trip_rebuilds_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word2vec-sv.bin");
        let vectors = sample();
        vectors.save(&path).unwrap();

        let loaded = WordVectors::load(&path).unwrap();
        assert_eq!(loaded, vectors);
        assert_eq!(loaded.nearest("katt", 1), vec!["kisse"]);
    }
}
