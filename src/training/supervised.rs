//! Supervised training loop
//!
//! A custom loop over Burn's autodiff API rather than the high-level
//! LearnerBuilder: forward, cross-entropy loss, backward, Adam step. The
//! learning rate is fixed; there is no decay schedule.
//!
//! Two snapshots are retained. The "best" artifact tracks the highest
//! validation accuracy and is written to disk whenever it improves. The
//! lowest-validation-loss parameters are additionally kept in memory so an
//! early stop can restore them before the "last" artifact is written.

use std::path::{Path, PathBuf};

use burn::{
    data::dataloader::batcher::Batcher,
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    record::CompactRecorder,
    tensor::backend::{AutodiffBackend, Backend},
    tensor::ElementConversion,
};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::loader::BatchLoader;
use crate::dataset::word_dataset::{WordBatch, WordBatcher, WordDataset, WordItem};
use crate::dataset::{labels::load_label_table, PartitionPaths};
use crate::model::config::CrnnConfig;
use crate::model::crnn::Crnn;
use crate::training::state::TrainingState;
use crate::training::{
    BEST_MODEL_STEM, DEFAULT_EPOCHS, DEFAULT_LEARNING_RATE, DEFAULT_PATIENCE, LAST_MODEL_STEM,
    VOCAB_FILE,
};
use crate::utils::error::{Error, Result};
use crate::utils::logging::TrainingLogger;
use crate::vocab::Vocabulary;
use crate::BATCH_SIZE;

/// Options for a training run
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Training partition (label table + image directory)
    pub train: PartitionPaths,
    /// Validation partition
    pub validation: PartitionPaths,
    /// Testing partition
    pub test: PartitionPaths,
    /// Directory receiving the artifacts (vocabulary, models, report)
    pub output_dir: PathBuf,
    /// Maximum number of epochs
    pub epochs: usize,
    /// Samples per batch
    pub batch_size: usize,
    /// Fixed Adam learning rate
    pub learning_rate: f64,
    /// Early-stopping patience in epochs
    pub patience: usize,
    /// Seed for the per-epoch shuffle
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            train: PartitionPaths::new(
                "data/Training/training_labels.csv",
                "data/Training/training_words",
            ),
            validation: PartitionPaths::new(
                "data/Validation/validation_labels.csv",
                "data/Validation/validation_words",
            ),
            test: PartitionPaths::new(
                "data/Testing/testing_labels.csv",
                "data/Testing/testing_words",
            ),
            output_dir: PathBuf::from("output/models"),
            epochs: DEFAULT_EPOCHS,
            batch_size: BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            patience: DEFAULT_PATIENCE,
            seed: 42,
        }
    }
}

/// Summary of a completed training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Number of classes in the vocabulary
    pub vocabulary_size: usize,
    /// Epochs actually run (may be below the budget on early stop)
    pub epochs_run: usize,
    /// Whether early stopping ended the run
    pub early_stopped: bool,
    /// Highest validation accuracy seen
    pub best_val_accuracy: f64,
    /// Test accuracy of the final-epoch parameters
    pub last_test_accuracy: f64,
    /// Test accuracy of the reloaded best artifact
    pub best_test_accuracy: f64,
    /// Completion timestamp (RFC 3339)
    pub trained_at: String,
}

/// Run supervised training end to end.
///
/// Builds the vocabulary from the union of all three partitions, persists it,
/// fits the classifier against the training partition with per-epoch
/// validation, and evaluates the retained artifacts on the test partition.
/// Every I/O failure is fatal; an offline batch run has nothing sensible to
/// recover to.
pub fn run_training<B: AutodiffBackend>(options: &TrainOptions) -> Result<TrainingReport> {
    let device = B::Device::default();

    std::fs::create_dir_all(&options.output_dir)?;

    println!("{}", "Loading label tables...".cyan());
    let train_records = load_label_table(&options.train.labels)?;
    let val_records = load_label_table(&options.validation.labels)?;
    let test_records = load_label_table(&options.test.labels)?;

    if train_records.is_empty() {
        return Err(Error::DataLoad {
            path: options.train.labels.clone(),
            reason: "training partition is empty".to_string(),
        });
    }

    // The vocabulary covers every partition, so validation/test-only labels
    // still have a class id. Built and persisted before training starts.
    let vocab = Vocabulary::build(
        train_records
            .iter()
            .chain(val_records.iter())
            .chain(test_records.iter())
            .map(|r| r.medicine_name.as_str()),
    );
    let vocab_path = options.output_dir.join(VOCAB_FILE);
    vocab.save(&vocab_path)?;

    println!("{}", "Assembling datasets...".cyan());
    let train_dataset = WordDataset::new(&train_records, &options.train.images, &vocab)?;
    let val_dataset = WordDataset::new(&val_records, &options.validation.images, &vocab)?;
    let test_dataset = WordDataset::new(&test_records, &options.test.images, &vocab)?;

    println!();
    println!("{}", "Dataset partitions:".cyan().bold());
    println!("  Training samples:   {}", train_dataset.len());
    println!("  Validation samples: {}", val_dataset.len());
    println!("  Testing samples:    {}", test_dataset.len());
    println!("  Vocabulary size:    {}", vocab.len());
    println!();

    let mut train_loader = BatchLoader::new(train_dataset, options.batch_size, true, options.seed);
    let mut val_loader = BatchLoader::new(val_dataset, options.batch_size, false, options.seed);
    let mut test_loader = BatchLoader::new(test_dataset, options.batch_size, false, options.seed);

    let config = CrnnConfig::new(vocab.len());
    config
        .validate()
        .map_err(Error::Serialization)?;

    let batcher = WordBatcher::new();
    let mut model = Crnn::<B>::new(&config, &device);
    let mut optimizer = AdamConfig::new().init();

    let mut state = TrainingState::new();
    let mut logger = TrainingLogger::new(options.epochs);
    let recorder = CompactRecorder::new();

    let best_path = options.output_dir.join(BEST_MODEL_STEM);
    let last_path = options.output_dir.join(LAST_MODEL_STEM);

    // Parameters at the lowest validation loss, for early-stop restoration
    let mut best_loss_model = model.clone();
    let mut early_stopped = false;

    println!("{}", "Starting training...".green().bold());

    for epoch in 0..options.epochs {
        logger.start_epoch(epoch);

        let mut epoch_loss = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;
        let num_batches = train_loader.num_batches();

        for (batch_idx, items) in train_loader.epoch().enumerate() {
            let items = items?;
            let batch: WordBatch<B> = batcher.batch(items, &device);

            // Forward pass
            let output = model.forward(batch.images.clone());

            // Cross-entropy against integer class ids
            let loss = CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;

            let [batch_size, _] = output.dims();
            let predictions = output.argmax(1).reshape([batch_size]);
            let batch_correct: i64 = predictions
                .equal(batch.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            seen += batch_size;

            // Backward pass and parameter update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(options.learning_rate, model, grads);

            if (batch_idx + 1) % 10 == 0 || batch_idx + 1 == num_batches {
                debug!(
                    "  Batch {}/{}: loss = {:.4}, acc = {:.2}%",
                    batch_idx + 1,
                    num_batches,
                    loss_value,
                    100.0 * correct as f64 / seen.max(1) as f64
                );
            }
        }

        let train_loss = epoch_loss / num_batches.max(1) as f64;
        let train_accuracy = correct as f64 / seen.max(1) as f64;

        // Validation pass on the inner (non-autodiff) model
        let inner_device = <B::InnerBackend as Backend>::Device::default();
        let (val_loss, val_accuracy) =
            evaluate(&model.valid(), &mut val_loader, &batcher, &inner_device)?;

        let outcome = state.update_epoch(train_loss, train_accuracy, val_loss, val_accuracy);
        logger.end_epoch(train_loss, val_loss, val_accuracy);

        if outcome.new_best_accuracy {
            logger.log_new_best(val_accuracy);
            save_model(&model, &config, &best_path, &recorder)?;
        }

        if outcome.new_best_loss {
            best_loss_model = model.clone();
        }

        if state.should_stop(options.patience) {
            logger.log_early_stop(options.patience);
            model = best_loss_model.clone();
            early_stopped = true;
            break;
        }
    }

    logger.log_complete(state.epoch, state.best_val_accuracy);

    // Final-epoch parameters (after any early-stop restoration)
    save_model(&model, &config, &last_path, &recorder)?;

    // Held-out evaluation of both artifacts
    println!();
    println!("{}", "Evaluating on the test partition...".cyan().bold());

    let inner_device = <B::InnerBackend as Backend>::Device::default();

    let last_model = model.valid();
    let (_, last_test_accuracy) =
        evaluate(&last_model, &mut test_loader, &batcher, &inner_device)?;
    println!(
        "  [LAST model] test accuracy: {:.2}%",
        last_test_accuracy * 100.0
    );

    let best_model = load_model::<B::InnerBackend>(&best_path, &inner_device)?;
    let (_, best_test_accuracy) =
        evaluate(&best_model, &mut test_loader, &batcher, &inner_device)?;
    println!(
        "  [BEST model] test accuracy: {:.2}%",
        best_test_accuracy * 100.0
    );

    print_sample_predictions(&best_model, &mut test_loader, &batcher, &vocab, &inner_device)?;

    let report = TrainingReport {
        vocabulary_size: vocab.len(),
        epochs_run: state.epoch,
        early_stopped,
        best_val_accuracy: state.best_val_accuracy,
        last_test_accuracy,
        best_test_accuracy,
        trained_at: chrono::Utc::now().to_rfc3339(),
    };

    let report_path = options.output_dir.join("training_report.json");
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    info!("Training report written to {:?}", report_path);

    Ok(report)
}

/// Evaluate a model over one traversal of a partition.
///
/// Returns (average loss, accuracy).
pub fn evaluate<B: Backend>(
    model: &Crnn<B>,
    loader: &mut BatchLoader,
    batcher: &WordBatcher,
    device: &B::Device,
) -> Result<(f64, f64)> {
    let mut total_loss = 0.0f64;
    let mut correct = 0usize;
    let mut seen = 0usize;
    let mut num_batches = 0usize;

    for items in loader.epoch() {
        let items = items?;
        let batch: WordBatch<B> = batcher.batch(items, device);

        let output = model.forward(batch.images);

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();
        total_loss += loss_value;
        num_batches += 1;

        let [batch_size, _] = output.dims();
        let predictions = output.argmax(1).reshape([batch_size]);
        let batch_correct: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();
        correct += batch_correct as usize;
        seen += batch_size;
    }

    let avg_loss = total_loss / num_batches.max(1) as f64;
    let accuracy = if seen > 0 {
        correct as f64 / seen as f64
    } else {
        0.0
    };

    Ok((avg_loss, accuracy))
}

/// Persist model weights plus the config describing the architecture
fn save_model<B: Backend>(
    model: &Crnn<B>,
    config: &CrnnConfig,
    path_stem: &Path,
    recorder: &CompactRecorder,
) -> Result<()> {
    if let Some(parent) = path_stem.parent() {
        std::fs::create_dir_all(parent)?;
    }

    model
        .clone()
        .save_file(path_stem, recorder)
        .map_err(|e| Error::Serialization(format!("failed to save model: {:?}", e)))?;
    config.save(&path_stem.with_extension("json"))?;

    debug!("Model saved to {:?}", path_stem);
    Ok(())
}

/// Rebuild a model from its persisted config and weights
fn load_model<B: Backend>(path_stem: &Path, device: &B::Device) -> Result<Crnn<B>> {
    let config_path = path_stem.with_extension("json");
    let config = CrnnConfig::load(&config_path).map_err(|e| Error::ArtifactLoad {
        path: config_path,
        reason: e.to_string(),
    })?;

    let recorder = CompactRecorder::new();
    Crnn::<B>::new(&config, device)
        .load_file(path_stem, &recorder, device)
        .map_err(|e| Error::ArtifactLoad {
            path: path_stem.to_path_buf(),
            reason: format!("{:?}", e),
        })
}

/// Run one test batch through the model and print true vs. predicted labels
fn print_sample_predictions<B: Backend>(
    model: &Crnn<B>,
    loader: &mut BatchLoader,
    batcher: &WordBatcher,
    vocab: &Vocabulary,
    device: &B::Device,
) -> Result<()> {
    let mut epoch = loader.epoch();
    let Some(items) = epoch.next() else {
        return Ok(());
    };
    let items: Vec<WordItem> = items?;
    drop(epoch);

    let batch: WordBatch<B> = batcher.batch(items.clone(), device);
    let probs = model.forward_probabilities(batch.images);
    let num_classes = vocab.len();
    let probs: Vec<f32> = probs
        .into_data()
        .to_vec()
        .map_err(|e| Error::Serialization(format!("{:?}", e)))?;

    println!();
    println!("{}", "Sample predictions (one test batch):".cyan().bold());

    for (item, row) in items.iter().zip(probs.chunks(num_classes)) {
        let (predicted_id, confidence) = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap_or((0, &0.0));

        let truth = vocab.word_of(item.label).unwrap_or("?");
        let predicted = vocab.word_of(predicted_id).unwrap_or("?");
        let marker = if predicted_id == item.label {
            "ok".green()
        } else {
            "x".red()
        };

        println!(
            "  {} true: {:24} predicted: {:24} ({:.1}%)",
            marker,
            truth,
            predicted,
            confidence * 100.0
        );
    }
    println!();

    Ok(())
}
