//! Epoch batch loading
//!
//! Turns a [`WordDataset`] into a restartable sequence of fixed-size batches.
//! Each call to [`BatchLoader::epoch`] starts a fresh traversal: when
//! shuffling is enabled the full row order is re-permuted from the seeded
//! generator, otherwise table order is preserved.
//!
//! Sample decoding for a batch runs in parallel under rayon, and a producer
//! thread keeps exactly one batch in flight ahead of the consumer, so image
//! I/O overlaps with model computation. Any preprocessing failure is handed
//! to the consumer as an error and ends the epoch.

use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::dataset::word_dataset::{WordDataset, WordItem};
use crate::utils::error::Result;

/// Batch source over one dataset partition
pub struct BatchLoader {
    dataset: Arc<WordDataset>,
    batch_size: usize,
    shuffle: bool,
    rng: ChaCha8Rng,
}

impl BatchLoader {
    /// Create a loader over a partition.
    ///
    /// `shuffle` should be true only for the training partition; evaluation
    /// partitions keep their table order.
    pub fn new(dataset: WordDataset, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        Self {
            dataset: Arc::new(dataset),
            batch_size,
            shuffle,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Number of samples in the underlying partition
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Number of batches per epoch (the final batch may be short)
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Start one traversal of the partition.
    ///
    /// Draws a fresh permutation from the loader's generator when shuffling,
    /// so consecutive epochs see independently shuffled orders.
    pub fn epoch(&mut self) -> EpochIter {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut self.rng);
        }

        let dataset = Arc::clone(&self.dataset);
        let batch_size = self.batch_size;

        // Bounded to one batch of look-ahead: the producer blocks until the
        // consumer has taken the previous batch.
        let (tx, rx) = sync_channel::<Result<Vec<WordItem>>>(1);

        let handle = std::thread::spawn(move || {
            for chunk in indices.chunks(batch_size) {
                let items: Result<Vec<WordItem>> = chunk
                    .par_iter()
                    .map(|&i| dataset.load_item(i))
                    .collect();

                let failed = items.is_err();
                if tx.send(items).is_err() || failed {
                    break;
                }
            }
        });

        EpochIter {
            rx,
            _producer: handle,
        }
    }
}

/// Iterator over one epoch's batches
pub struct EpochIter {
    rx: Receiver<Result<Vec<WordItem>>>,
    _producer: JoinHandle<()>,
}

impl Iterator for EpochIter {
    type Item = Result<Vec<WordItem>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::labels::LabelRecord;
    use crate::dataset::preprocess::test_support::synthetic_png;
    use crate::vocab::Vocabulary;

    fn build_partition(dir_name: &str, count: usize) -> WordDataset {
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();

        let names = ["Napa", "Zimax"];
        let records: Vec<LabelRecord> = (0..count)
            .map(|i| {
                let file = format!("{}.png", i);
                std::fs::write(dir.join(&file), synthetic_png(64, 32, i % 2 == 0)).unwrap();
                LabelRecord {
                    image: file,
                    medicine_name: names[i % 2].to_string(),
                }
            })
            .collect();

        let vocab = Vocabulary::build(names);
        WordDataset::new(&records, &dir, &vocab).unwrap()
    }

    #[test]
    fn test_batch_sizes_with_short_tail() {
        let dataset = build_partition("medscript_loader_tail", 7);
        let mut loader = BatchLoader::new(dataset, 3, false, 42);
        assert_eq!(loader.num_batches(), 3);

        let sizes: Vec<usize> = loader
            .epoch()
            .map(|batch| batch.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_unshuffled_epoch_preserves_order() {
        let dataset = build_partition("medscript_loader_order", 6);
        let expected: Vec<usize> = (0..6).map(|i| dataset.label(i).unwrap()).collect();

        let mut loader = BatchLoader::new(dataset, 4, false, 42);
        for _ in 0..2 {
            let labels: Vec<usize> = loader
                .epoch()
                .flat_map(|batch| batch.unwrap().into_iter().map(|item| item.label))
                .collect();
            assert_eq!(labels, expected);
        }
    }

    #[test]
    fn test_shuffled_epochs_cover_all_samples() {
        let dataset = build_partition("medscript_loader_shuffle", 10);
        let mut loader = BatchLoader::new(dataset, 4, true, 7);

        let mut paths: Vec<String> = loader
            .epoch()
            .flat_map(|batch| batch.unwrap().into_iter().map(|item| item.path))
            .collect();
        assert_eq!(paths.len(), 10);
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 10, "every sample appears exactly once");
    }

    #[test]
    fn test_shuffled_epochs_differ() {
        let dataset = build_partition("medscript_loader_differ", 16);
        let mut loader = BatchLoader::new(dataset, 16, true, 3);

        let order = |iter: EpochIter| -> Vec<String> {
            iter.flat_map(|b| b.unwrap().into_iter().map(|i| i.path)).collect()
        };

        let first = order(loader.epoch());
        let second = order(loader.epoch());
        // 16! orderings; a seeded collision would be astronomically unlikely
        assert_ne!(first, second);
    }
}
