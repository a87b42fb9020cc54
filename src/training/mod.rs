//! Training module
//!
//! This module provides:
//! - The supervised training loop with per-epoch validation
//! - Model selection (best validation accuracy) and early stopping
//!   (validation loss patience) bookkeeping
//! - Held-out test evaluation of the retained artifacts

pub mod state;
pub mod supervised;

// Re-export main types for convenience
pub use state::{EpochOutcome, TrainingState};
pub use supervised::{evaluate, run_training, TrainOptions, TrainingReport};

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 40;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Default early-stopping patience (epochs without validation loss improvement)
pub const DEFAULT_PATIENCE: usize = 6;

/// File stem of the best-by-validation-accuracy artifact
pub const BEST_MODEL_STEM: &str = "best_crnn";

/// File stem of the final-epoch artifact
pub const LAST_MODEL_STEM: &str = "last_crnn";

/// File name of the persisted vocabulary
pub const VOCAB_FILE: &str = "id2word.json";
