//! Training state bookkeeping
//!
//! Tracks per-epoch history and the two selection signals the loop monitors:
//! validation accuracy decides which snapshot is the "best" artifact, while
//! validation loss drives early stopping.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What an epoch's validation results changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochOutcome {
    /// Validation accuracy reached a new maximum (save a new best artifact)
    pub new_best_accuracy: bool,
    /// Validation loss reached a new minimum (snapshot for early-stop restore)
    pub new_best_loss: bool,
}

/// Training state for monitoring and early stopping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingState {
    /// Number of completed epochs
    pub epoch: usize,
    /// Best validation accuracy seen so far
    pub best_val_accuracy: f64,
    /// Lowest validation loss seen so far
    pub best_val_loss: f64,
    /// Epochs since the validation loss last improved
    pub patience_counter: usize,
    /// Training loss history (per epoch)
    pub train_losses: Vec<f64>,
    /// Training accuracy history (per epoch)
    pub train_accuracies: Vec<f64>,
    /// Validation loss history (per epoch)
    pub val_losses: Vec<f64>,
    /// Validation accuracy history (per epoch)
    pub val_accuracies: Vec<f64>,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self {
            epoch: 0,
            best_val_accuracy: 0.0,
            best_val_loss: f64::INFINITY,
            patience_counter: 0,
            train_losses: Vec::new(),
            train_accuracies: Vec::new(),
            val_losses: Vec::new(),
            val_accuracies: Vec::new(),
        }
    }
}

impl TrainingState {
    /// Create a fresh state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one epoch's metrics and update both selection signals.
    pub fn update_epoch(
        &mut self,
        train_loss: f64,
        train_accuracy: f64,
        val_loss: f64,
        val_accuracy: f64,
    ) -> EpochOutcome {
        self.epoch += 1;

        self.train_losses.push(train_loss);
        self.train_accuracies.push(train_accuracy);
        self.val_losses.push(val_loss);
        self.val_accuracies.push(val_accuracy);

        let new_best_accuracy = val_accuracy > self.best_val_accuracy;
        if new_best_accuracy {
            info!(
                "Validation accuracy improved: {:.2}% -> {:.2}%",
                self.best_val_accuracy * 100.0,
                val_accuracy * 100.0
            );
            self.best_val_accuracy = val_accuracy;
        }

        let new_best_loss = val_loss < self.best_val_loss;
        if new_best_loss {
            debug!(
                "Validation loss improved: {:.4} -> {:.4}",
                self.best_val_loss, val_loss
            );
            self.best_val_loss = val_loss;
            self.patience_counter = 0;
        } else {
            self.patience_counter += 1;
            debug!(
                "No validation loss improvement for {} epoch(s) (best: {:.4})",
                self.patience_counter, self.best_val_loss
            );
        }

        EpochOutcome {
            new_best_accuracy,
            new_best_loss,
        }
    }

    /// Whether early stopping should trigger for the given patience
    pub fn should_stop(&self, patience: usize) -> bool {
        self.patience_counter >= patience
    }
}
