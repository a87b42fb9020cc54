//! Burn dataset integration for prescription word images
//!
//! Joins a label table with an image directory into an indexable source of
//! preprocessed samples, and implements Burn's `Dataset` and `Batcher` traits
//! on top of it.

use std::path::PathBuf;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::labels::LabelRecord;
use crate::dataset::preprocess::preprocess_file;
use crate::utils::error::{Error, Result};
use crate::vocab::{clean_word, Vocabulary};
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// A single preprocessed word image ready for batching
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordItem {
    /// Normalized grayscale pixels, row-major [IMG_HEIGHT * IMG_WIDTH]
    pub pixels: Vec<f32>,
    /// Class id of the cleaned medicine name
    pub label: usize,
    /// Source image path (for debugging/logging)
    pub path: String,
}

/// One partition's rows, resolved and vocabulary-mapped
#[derive(Debug, Clone)]
pub struct WordDataset {
    /// (absolute image path, class id) per row, in table order
    rows: Vec<(PathBuf, usize)>,
}

impl WordDataset {
    /// Join a label table with its image directory.
    ///
    /// Every file name is resolved against `image_dir` and checked for
    /// existence up front, and every cleaned label is mapped through the
    /// vocabulary. A label absent from the vocabulary cannot occur when the
    /// vocabulary was built from all partitions, but is checked anyway since
    /// it would silently corrupt training.
    pub fn new(
        records: &[LabelRecord],
        image_dir: impl Into<PathBuf>,
        vocab: &Vocabulary,
    ) -> Result<Self> {
        let image_dir = image_dir.into();

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let path = image_dir.join(&record.image);
            if !path.is_file() {
                return Err(Error::DataLoad {
                    path,
                    reason: "image file not found".to_string(),
                });
            }

            let cleaned = clean_word(&record.medicine_name);
            let label = vocab
                .id_of(&cleaned)
                .ok_or_else(|| Error::VocabularyMismatch(cleaned.clone()))?;

            rows.push((path, label));
        }

        Ok(Self { rows })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the partition is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Class id of a row, without loading the image
    pub fn label(&self, index: usize) -> Option<usize> {
        self.rows.get(index).map(|(_, label)| *label)
    }

    /// Load and preprocess one sample, propagating failures.
    ///
    /// This is the accessor the training pipeline uses; any decode or read
    /// failure aborts the run.
    pub fn load_item(&self, index: usize) -> Result<WordItem> {
        let (path, label) = self.rows.get(index).ok_or_else(|| {
            Error::DataLoad {
                path: PathBuf::new(),
                reason: format!("sample index {} out of range", index),
            }
        })?;

        let pixels = preprocess_file(path)?;
        Ok(WordItem {
            pixels,
            label: *label,
            path: path.to_string_lossy().to_string(),
        })
    }
}

impl Dataset<WordItem> for WordDataset {
    fn get(&self, index: usize) -> Option<WordItem> {
        self.load_item(index).ok()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// A batch of word images for the classifier
#[derive(Clone, Debug)]
pub struct WordBatch<B: Backend> {
    /// Batch of images with shape [batch_size, 1, height, width]
    pub images: Tensor<B, 4>,
    /// Batch of class ids with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher for creating word-image batches
#[derive(Clone, Debug, Default)]
pub struct WordBatcher;

impl WordBatcher {
    /// Create a new batcher
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, WordItem, WordBatch<B>> for WordBatcher {
    fn batch(&self, items: Vec<WordItem>, device: &B::Device) -> WordBatch<B> {
        let batch_size = items.len();

        // Flatten all images into a single vector
        let images_data: Vec<f32> = items.iter().flat_map(|item| item.pixels.clone()).collect();

        // Create image tensor with shape [batch_size, 1, height, width]
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 1, IMG_HEIGHT, IMG_WIDTH]),
            device,
        );

        // Create targets tensor
        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        WordBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::preprocess::test_support::synthetic_png;

    type TestBackend = burn::backend::NdArray;

    fn temp_partition(dir_name: &str) -> (PathBuf, Vec<LabelRecord>) {
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();

        let mut records = Vec::new();
        for (i, (name, lit_left)) in [("Napa", true), ("Zimax", false), ("Napa", true)]
            .iter()
            .enumerate()
        {
            let file = format!("{}.png", i);
            std::fs::write(dir.join(&file), synthetic_png(100, 40, *lit_left)).unwrap();
            records.push(LabelRecord {
                image: file,
                medicine_name: name.to_string(),
            });
        }

        (dir, records)
    }

    #[test]
    fn test_dataset_maps_labels() {
        let (dir, records) = temp_partition("medscript_wd_maps");
        let vocab = Vocabulary::build(["Napa", "Zimax"]);

        let dataset = WordDataset::new(&records, &dir, &vocab).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.label(0), Some(vocab.id_of("Napa").unwrap()));
        assert_eq!(dataset.label(1), Some(vocab.id_of("Zimax").unwrap()));

        let item = dataset.load_item(0).unwrap();
        assert_eq!(item.pixels.len(), IMG_HEIGHT * IMG_WIDTH);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_label_is_vocabulary_mismatch() {
        let (dir, records) = temp_partition("medscript_wd_mismatch");
        let vocab = Vocabulary::build(["Napa"]); // no Zimax

        let result = WordDataset::new(&records, &dir, &vocab);
        assert!(matches!(result, Err(Error::VocabularyMismatch(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_image_is_data_load_error() {
        let (dir, mut records) = temp_partition("medscript_wd_missing");
        records.push(LabelRecord {
            image: "does_not_exist.png".to_string(),
            medicine_name: "Napa".to_string(),
        });
        let vocab = Vocabulary::build(["Napa", "Zimax"]);

        let result = WordDataset::new(&records, &dir, &vocab);
        assert!(matches!(result, Err(Error::DataLoad { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_burn_dataset_view() {
        // The trait view lets Burn's stock dataloaders consume the partition
        let (dir, records) = temp_partition("medscript_wd_trait");
        let vocab = Vocabulary::build(["Napa", "Zimax"]);
        let dataset = WordDataset::new(&records, &dir, &vocab).unwrap();

        assert_eq!(Dataset::len(&dataset), 3);
        let item = Dataset::get(&dataset, 2).unwrap();
        assert_eq!(item.label, vocab.id_of("Napa").unwrap());
        assert!(Dataset::get(&dataset, 99).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_batcher_shapes() {
        let device = Default::default();
        let batcher = WordBatcher::new();

        let items: Vec<WordItem> = (0..5)
            .map(|i| WordItem {
                pixels: vec![0.5; IMG_HEIGHT * IMG_WIDTH],
                label: i % 2,
                path: format!("{}.png", i),
            })
            .collect();

        let batch: WordBatch<TestBackend> = batcher.batch(items, &device);
        assert_eq!(batch.images.dims(), [5, 1, IMG_HEIGHT, IMG_WIDTH]);
        assert_eq!(batch.targets.dims(), [5]);
    }
}
