//! Model configuration
//!
//! The architecture is fixed by design; the configuration exists so the
//! serialized artifact is self-describing and a later process can rebuild
//! the exact network before loading weights.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Configuration for the convolutional-recurrent classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrnnConfig {
    /// Number of output classes (the vocabulary size)
    pub num_classes: usize,

    /// Input image height
    pub img_height: usize,

    /// Input image width
    pub img_width: usize,

    /// Channel widths of the three convolution stages
    pub conv_filters: [usize; 3],

    /// Kernel size for convolutional layers
    pub kernel_size: usize,

    /// LSTM hidden width per direction
    pub rnn_hidden: usize,

    /// Units in the fully connected layer before the classifier
    pub fc_units: usize,

    /// Dropout rate applied before the final layer (training only)
    pub dropout: f64,
}

impl CrnnConfig {
    /// Create a configuration for a vocabulary of the given size
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            img_height: IMG_HEIGHT,
            img_width: IMG_WIDTH,
            conv_filters: [32, 64, 128],
            kernel_size: 3,
            rnn_hidden: 128,
            fc_units: 256,
            dropout: 0.3,
        }
    }

    /// Spatial reduction factor of the convolution stack (2 per pool stage)
    pub fn downsample_factor(&self) -> usize {
        1 << self.conv_filters.len()
    }

    /// Sequence length seen by the recurrent layer (reduced width)
    pub fn seq_len(&self) -> usize {
        self.img_width / self.downsample_factor()
    }

    /// Feature width per sequence step (reduced height x last conv channels)
    pub fn features_per_step(&self) -> usize {
        (self.img_height / self.downsample_factor()) * self.conv_filters[2]
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.num_classes == 0 {
            return Err("num_classes must be greater than 0".to_string());
        }

        let factor = self.downsample_factor();
        if self.img_height % factor != 0 || self.img_width % factor != 0 {
            return Err(format!(
                "image dimensions must be divisible by {} (one halving per pool stage)",
                factor
            ));
        }

        if self.kernel_size < 1 || self.kernel_size % 2 == 0 {
            return Err("kernel_size must be a positive odd number".to_string());
        }

        if self.dropout < 0.0 || self.dropout >= 1.0 {
            return Err("dropout must be in range [0.0, 1.0)".to_string());
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CrnnConfig::new(78);
        assert_eq!(config.num_classes, 78);
        assert_eq!(config.img_height, 64);
        assert_eq!(config.img_width, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sequence_geometry() {
        let config = CrnnConfig::new(10);
        // 64x256 -> 8x32 after three 2x2 pools
        assert_eq!(config.downsample_factor(), 8);
        assert_eq!(config.seq_len(), 32);
        assert_eq!(config.features_per_step(), 8 * 128);
    }

    #[test]
    fn test_validation() {
        let mut config = CrnnConfig::new(0);
        assert!(config.validate().is_err());

        config = CrnnConfig::new(10);
        config.img_height = 60; // not divisible by 8
        assert!(config.validate().is_err());

        config = CrnnConfig::new(10);
        config.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let config = CrnnConfig::new(42);
        let path = std::env::temp_dir().join("medscript_crnn_config.json");

        config.save(&path).unwrap();
        let reloaded = CrnnConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config, reloaded);
    }
}
