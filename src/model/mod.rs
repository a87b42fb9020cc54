//! Model module
//!
//! The classifier is a fixed convolutional-recurrent architecture: three
//! conv/pool stages extract stroke features, then a bidirectional LSTM reads
//! the reduced feature map as a left-to-right sequence of column vectors and
//! a small fully connected head scores each vocabulary class.

pub mod config;
pub mod crnn;

// Re-export main types for convenience
pub use config::CrnnConfig;
pub use crnn::{ConvBlock, Crnn};
