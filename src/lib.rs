//! # MedScript
//!
//! A Rust library for recognizing handwritten medicine names from scanned
//! prescription word images, built on the Burn framework.
//!
//! The pipeline classifies a whole word image against a closed vocabulary of
//! medicine names derived from the labeled dataset. A convolutional stack
//! extracts stroke features, and a bidirectional LSTM reads the feature map
//! as a left-to-right sequence of column vectors, so no per-character
//! segmentation is needed.
//!
//! ## Modules
//!
//! - `vocab`: label cleaning and the word/class-id vocabulary
//! - `dataset`: label tables, image preprocessing, batching and epoch loading
//! - `model`: the convolutional-recurrent classifier
//! - `training`: the supervised training and evaluation loop
//! - `inference`: loading trained artifacts and predicting on image bytes
//! - `utils`: error types and logging helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use medscript::backend::TrainingBackend;
//! use medscript::training::{run_training, TrainOptions};
//!
//! let report = run_training::<TrainingBackend>(&TrainOptions::default())?;
//! println!("test accuracy: {:.2}%", report.best_test_accuracy * 100.0);
//! ```

pub mod backend;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;
pub mod vocab;

// Re-export commonly used items for convenience
pub use dataset::labels::{load_label_table, LabelRecord};
pub use dataset::loader::BatchLoader;
pub use dataset::preprocess::{preprocess_bytes, preprocess_file};
pub use dataset::word_dataset::{WordBatch, WordBatcher, WordDataset, WordItem};
pub use inference::predictor::{Prediction, Predictor};
pub use model::config::CrnnConfig;
pub use model::crnn::Crnn;
pub use training::supervised::{run_training, TrainOptions, TrainingReport};
pub use training::TrainingState;
pub use utils::error::{Error, Result};
pub use vocab::{clean_word, Vocabulary};

/// Fixed input image height in pixels
pub const IMG_HEIGHT: usize = 64;

/// Fixed input image width in pixels
pub const IMG_WIDTH: usize = 256;

/// Number of samples per training batch
pub const BATCH_SIZE: usize = 32;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
