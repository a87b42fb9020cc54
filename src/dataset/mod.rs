//! Dataset module for prescription word images
//!
//! This module provides:
//! - Loading CSV label tables (one row per word image)
//! - The shared image preprocessing transform
//! - Joining labels and images into a batched, shuffled epoch source
//!
//! ## Partitions
//!
//! The dataset ships as three disjoint partitions (training, validation,
//! testing), each a CSV label table plus a directory of PNG word images. The
//! vocabulary is built from all three together before training starts, so
//! every label in any partition has a class id.

pub mod labels;
pub mod loader;
pub mod preprocess;
pub mod word_dataset;

// Re-export main types for convenience
pub use labels::{load_label_table, LabelRecord};
pub use loader::{BatchLoader, EpochIter};
pub use preprocess::{preprocess_bytes, preprocess_file};
pub use word_dataset::{WordBatch, WordBatcher, WordDataset, WordItem};

/// Paths for one labeled partition
#[derive(Debug, Clone)]
pub struct PartitionPaths {
    /// CSV label table for the partition
    pub labels: std::path::PathBuf,
    /// Directory containing the partition's word images
    pub images: std::path::PathBuf,
}

impl PartitionPaths {
    pub fn new(labels: impl Into<std::path::PathBuf>, images: impl Into<std::path::PathBuf>) -> Self {
        Self {
            labels: labels.into(),
            images: images.into(),
        }
    }
}
