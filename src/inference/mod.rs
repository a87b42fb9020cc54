//! Inference module
//!
//! Loads a trained classifier and its vocabulary once, and predicts medicine
//! names from encoded image bytes. The loaded state is an explicit context
//! object that callers construct at startup and share read-only; there are
//! no module-level singletons.

pub mod predictor;

// Re-export main types for convenience
pub use predictor::{Prediction, Predictor};
