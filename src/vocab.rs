//! Medicine-name vocabulary
//!
//! The classifier operates over a closed set of medicine names. The
//! vocabulary is derived once from every labeled partition (training,
//! validation and testing together), so any label the pipeline will ever see
//! has a class id. Ids are assigned by lexicographic rank of the cleaned
//! name, which makes the mapping deterministic regardless of input order.
//!
//! The vocabulary is the one artifact besides the model weights that training
//! and serving must share exactly, so it is persisted as JSON and reloaded by
//! the inference side.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use tracing::info;

use crate::utils::error::{Error, Result};

/// Canonicalize a raw medicine-name label.
///
/// Removes every whitespace and hyphen character. The cleaned form is the
/// class key used everywhere a label is read; applying a different cleaning
/// at any call site would silently desynchronize the class space.
pub fn clean_word(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// The closed, ordered set of recognizable medicine names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Cleaned names in id order (id = index)
    words: Vec<String>,
    /// Reverse lookup from cleaned name to id
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from raw labels.
    ///
    /// Labels are cleaned, deduplicated and sorted ascending; ids `0..N-1`
    /// follow the sorted order. Rebuilding from any permutation of the same
    /// labels yields an identical mapping. An empty input yields an empty
    /// vocabulary.
    pub fn build<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = labels
            .into_iter()
            .map(|raw| clean_word(raw.as_ref()))
            .collect();

        let words: Vec<String> = unique.into_iter().collect();
        let index = words
            .iter()
            .enumerate()
            .map(|(id, word)| (word.clone(), id))
            .collect();

        let vocab = Self { words, index };
        info!("Vocabulary built: {} unique medicine names", vocab.len());
        vocab
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Class id for an already-cleaned name
    pub fn id_of(&self, cleaned: &str) -> Option<usize> {
        self.index.get(cleaned).copied()
    }

    /// Cleaned name for a class id
    pub fn word_of(&self, id: usize) -> Option<&str> {
        self.words.get(id).map(|s| s.as_str())
    }

    /// All cleaned names in id order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Persist the id-to-word mapping as JSON.
    ///
    /// The file is an object with string integer keys, e.g.
    /// `{"0": "Amoxicillin", "1": "Paracetamol"}`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let map: BTreeMap<String, &str> = self
            .words
            .iter()
            .enumerate()
            .map(|(id, word)| (id.to_string(), word.as_str()))
            .collect();

        let json = serde_json::to_string_pretty(&map)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reload a vocabulary persisted by [`Vocabulary::save`].
    ///
    /// Keys are parsed back to integers; the ids must form a dense range
    /// `0..N-1` or the file is rejected as corrupt.
    pub fn load(path: &Path) -> Result<Self> {
        let artifact_err = |reason: String| Error::ArtifactLoad {
            path: path.to_path_buf(),
            reason,
        };

        let json = std::fs::read_to_string(path)
            .map_err(|e| artifact_err(e.to_string()))?;
        let map: HashMap<String, String> =
            serde_json::from_str(&json).map_err(|e| artifact_err(e.to_string()))?;

        let mut words = vec![None; map.len()];
        for (key, word) in map {
            let id: usize = key
                .parse()
                .map_err(|_| artifact_err(format!("non-integer class id '{}'", key)))?;
            let slot = words
                .get_mut(id)
                .ok_or_else(|| artifact_err(format!("class id {} out of range", id)))?;
            if slot.replace(word).is_some() {
                return Err(artifact_err(format!("duplicate class id {}", id)));
            }
        }

        let words: Vec<String> = words
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| artifact_err("class ids are not contiguous".to_string()))?;

        let index = words
            .iter()
            .enumerate()
            .map(|(id, word)| (word.clone(), id))
            .collect();

        Ok(Self { words, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_word() {
        assert_eq!(clean_word(" Para-cetamol "), "Paracetamol");
        assert_eq!(clean_word("A-B C"), "ABC");
        assert_eq!(clean_word("Amoxicillin"), "Amoxicillin");
        assert_eq!(clean_word("  \t "), "");
    }

    #[test]
    fn test_build_sorted_ids() {
        let vocab = Vocabulary::build(["Zinc", "Aspirin", "Napa"]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.id_of("Aspirin"), Some(0));
        assert_eq!(vocab.id_of("Napa"), Some(1));
        assert_eq!(vocab.id_of("Zinc"), Some(2));
    }

    #[test]
    fn test_build_is_order_independent() {
        let a = Vocabulary::build(["Napa", "Aspirin", "Zinc", "Aspirin"]);
        let b = Vocabulary::build(["Zinc", "Aspirin", "Napa"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_round_trip_over_cleaned_labels() {
        let labels = [" Para-cetamol ", "Amoxi-cillin", "Napa"];
        let vocab = Vocabulary::build(labels);

        for raw in labels {
            let cleaned = clean_word(raw);
            let id = vocab.id_of(&cleaned).unwrap();
            assert_eq!(vocab.word_of(id), Some(cleaned.as_str()));
        }
    }

    #[test]
    fn test_empty_input() {
        let vocab = Vocabulary::build(Vec::<String>::new());
        assert!(vocab.is_empty());
        assert_eq!(vocab.id_of("anything"), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let vocab = Vocabulary::build(["Paracetamol", "Amoxicillin", "Esoral"]);

        let path = std::env::temp_dir().join("medscript_vocab_round_trip.json");
        vocab.save(&path).unwrap();
        let reloaded = Vocabulary::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(vocab, reloaded);
    }

    #[test]
    fn test_load_rejects_sparse_ids() {
        let path = std::env::temp_dir().join("medscript_vocab_sparse.json");
        std::fs::write(&path, r#"{"0": "Napa", "2": "Zinc"}"#).unwrap();
        let result = Vocabulary::load(&path);
        std::fs::remove_file(&path).ok();

        assert!(matches!(result, Err(Error::ArtifactLoad { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Vocabulary::load(Path::new("/nonexistent/id2word.json"));
        assert!(matches!(result, Err(Error::ArtifactLoad { .. })));
    }
}
