//! Prediction on trained artifacts
//!
//! The [`Predictor`] owns everything serving needs: the rebuilt model, its
//! weights and the vocabulary's reverse mapping. It is constructed once and
//! never mutated, so shared references can serve concurrent predictions.

use std::path::Path;

use burn::prelude::*;
use burn::record::CompactRecorder;
use serde::{Deserialize, Serialize};

use crate::dataset::preprocess::preprocess_bytes;
use crate::model::config::CrnnConfig;
use crate::model::crnn::Crnn;
use crate::utils::error::{Error, Result};
use crate::vocab::Vocabulary;
use crate::{IMG_HEIGHT, IMG_WIDTH};

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted medicine name (cleaned vocabulary form)
    pub prediction: String,
    /// Probability of the predicted class, in [0, 1]
    pub confidence: f32,
}

/// A loaded classifier ready to serve predictions
pub struct Predictor<B: Backend> {
    model: Crnn<B>,
    vocab: Vocabulary,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load a trained model and its vocabulary.
    ///
    /// `model_path` is the artifact stem written by training; the weights
    /// live at `<stem>.mpk` and the architecture config at `<stem>.json`.
    /// Any missing or malformed file fails with [`Error::ArtifactLoad`], as
    /// does a class-count disagreement between config and vocabulary.
    pub fn load(model_path: &Path, vocab_path: &Path, device: B::Device) -> Result<Self> {
        let vocab = Vocabulary::load(vocab_path)?;

        let config_path = model_path.with_extension("json");
        let config = CrnnConfig::load(&config_path).map_err(|e| Error::ArtifactLoad {
            path: config_path.clone(),
            reason: e.to_string(),
        })?;

        if config.num_classes != vocab.len() {
            return Err(Error::ArtifactLoad {
                path: config_path,
                reason: format!(
                    "model expects {} classes but the vocabulary has {}",
                    config.num_classes,
                    vocab.len()
                ),
            });
        }

        // The preprocessor is fixed at 64x256; a model trained for any other
        // geometry cannot be served
        if config.img_height != IMG_HEIGHT || config.img_width != IMG_WIDTH {
            return Err(Error::ArtifactLoad {
                path: config_path,
                reason: format!(
                    "model expects {}x{} input but the preprocessor produces {}x{}",
                    config.img_height, config.img_width, IMG_HEIGHT, IMG_WIDTH
                ),
            });
        }

        let recorder = CompactRecorder::new();
        let model = Crnn::<B>::new(&config, &device)
            .load_file(model_path, &recorder, &device)
            .map_err(|e| Error::ArtifactLoad {
                path: model_path.to_path_buf(),
                reason: format!("{:?}", e),
            })?;

        Ok(Self {
            model,
            vocab,
            device,
        })
    }

    /// Predict the medicine name on one encoded image.
    ///
    /// Applies the same preprocessing as training, then returns the arg-max
    /// class and its probability. All-or-nothing: a decode failure yields an
    /// error, never a partial result.
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction> {
        let pixels = preprocess_bytes(image_bytes)?;

        let input = Tensor::<B, 4>::from_floats(
            TensorData::new(pixels, [1, 1, IMG_HEIGHT, IMG_WIDTH]),
            &self.device,
        );

        let probs = self.model.forward_probabilities(input);
        let probs: Vec<f32> = probs
            .into_data()
            .to_vec()
            .map_err(|e| Error::Serialization(format!("{:?}", e)))?;

        let (class_id, confidence) = probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, &p)| (i, p))
            .ok_or_else(|| Error::VocabularyMismatch("empty class space".to_string()))?;

        let word = self
            .vocab
            .word_of(class_id)
            .ok_or_else(|| Error::VocabularyMismatch(format!("class id {}", class_id)))?;

        Ok(Prediction {
            prediction: word.to_string(),
            confidence,
        })
    }

    /// Predict on a stored image file
    pub fn predict_file(&self, path: &Path) -> Result<Prediction> {
        let bytes = std::fs::read(path).map_err(|e| Error::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.predict(&bytes)
    }

    /// Number of classes the loaded model distinguishes
    pub fn num_classes(&self) -> usize {
        self.vocab.len()
    }

    /// The loaded vocabulary
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }
}
