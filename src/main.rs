//! MedScript CLI
//!
//! Entry point for training the prescription word classifier and for running
//! one-off predictions against a trained artifact.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use medscript::backend::{backend_name, default_device, TrainingBackend};
use medscript::dataset::{labels::load_label_table, PartitionPaths};
use medscript::training::supervised::{run_training, TrainOptions};
use medscript::utils::logging::{init_logging, LogConfig};
use medscript::vocab::Vocabulary;

/// Handwritten prescription medicine-name recognition
#[derive(Parser, Debug)]
#[command(name = "medscript")]
#[command(version)]
#[command(about = "Handwritten prescription word recognition with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier on the labeled word-image dataset
    Train {
        /// Training label table (CSV)
        #[arg(long, default_value = "data/Training/training_labels.csv")]
        train_labels: PathBuf,

        /// Training image directory
        #[arg(long, default_value = "data/Training/training_words")]
        train_images: PathBuf,

        /// Validation label table (CSV)
        #[arg(long, default_value = "data/Validation/validation_labels.csv")]
        val_labels: PathBuf,

        /// Validation image directory
        #[arg(long, default_value = "data/Validation/validation_words")]
        val_images: PathBuf,

        /// Testing label table (CSV)
        #[arg(long, default_value = "data/Testing/testing_labels.csv")]
        test_labels: PathBuf,

        /// Testing image directory
        #[arg(long, default_value = "data/Testing/testing_words")]
        test_images: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value = "40")]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Early-stopping patience (epochs without validation loss improvement)
        #[arg(long, default_value = "6")]
        patience: usize,

        /// Output directory for model artifacts
        #[arg(short, long, default_value = "output/models")]
        output_dir: PathBuf,

        /// Random seed for the per-epoch shuffle
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Predict the medicine name on a single word image
    Predict {
        /// Path to the model artifact stem (e.g. output/models/best_crnn)
        #[arg(short, long)]
        model: PathBuf,

        /// Path to the vocabulary file (id2word.json)
        #[arg(long, default_value = "output/models/id2word.json")]
        vocab: PathBuf,

        /// Path to the input PNG word image
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Show label-table statistics and the derived vocabulary size
    Stats {
        /// Training label table (CSV)
        #[arg(long, default_value = "data/Training/training_labels.csv")]
        train_labels: PathBuf,

        /// Validation label table (CSV)
        #[arg(long, default_value = "data/Validation/validation_labels.csv")]
        val_labels: PathBuf,

        /// Testing label table (CSV)
        #[arg(long, default_value = "data/Testing/testing_labels.csv")]
        test_labels: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            train_labels,
            train_images,
            val_labels,
            val_images,
            test_labels,
            test_images,
            epochs,
            batch_size,
            learning_rate,
            patience,
            output_dir,
            seed,
        } => {
            let options = TrainOptions {
                train: PartitionPaths::new(train_labels, train_images),
                validation: PartitionPaths::new(val_labels, val_images),
                test: PartitionPaths::new(test_labels, test_images),
                output_dir,
                epochs,
                batch_size,
                learning_rate,
                patience,
                seed,
            };

            info!("Backend: {}", backend_name());
            let report = run_training::<TrainingBackend>(&options)?;

            println!("{}", "Training complete!".green().bold());
            println!(
                "  Best validation accuracy: {:.2}%",
                report.best_val_accuracy * 100.0
            );
            println!(
                "  Test accuracy (last / best): {:.2}% / {:.2}%",
                report.last_test_accuracy * 100.0,
                report.best_test_accuracy * 100.0
            );
        }

        Commands::Predict {
            model,
            vocab,
            image,
        } => {
            cmd_predict(&model, &vocab, &image)?;
        }

        Commands::Stats {
            train_labels,
            val_labels,
            test_labels,
        } => {
            cmd_stats(&train_labels, &val_labels, &test_labels)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +--------------------------------------------------------------+
 |   MedScript - Handwritten Prescription Recognition           |
 |   Medicine-name word classification with Burn + Rust         |
 +--------------------------------------------------------------+
"#
        .green()
    );
}

fn cmd_predict(model: &PathBuf, vocab: &PathBuf, image: &PathBuf) -> Result<()> {
    use medscript::backend::DefaultBackend;
    use medscript::inference::predictor::Predictor;

    info!("Running prediction");
    info!("  Model: {:?}", model);
    info!("  Image: {:?}", image);

    println!("{}", "Loading model...".cyan());
    let predictor = Predictor::<DefaultBackend>::load(model, vocab, default_device())?;
    println!("  {} classes, backend: {}", predictor.num_classes(), backend_name());

    let start = std::time::Instant::now();
    let prediction = predictor.predict_file(image)?;
    let elapsed = start.elapsed();

    println!();
    println!("  Prediction: {}", prediction.prediction.yellow().bold());
    println!("  Confidence: {:.1}%", prediction.confidence * 100.0);
    println!("  Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_stats(train_labels: &PathBuf, val_labels: &PathBuf, test_labels: &PathBuf) -> Result<()> {
    let train = load_label_table(train_labels)?;
    let val = load_label_table(val_labels)?;
    let test = load_label_table(test_labels)?;

    let vocab = Vocabulary::build(
        train
            .iter()
            .chain(val.iter())
            .chain(test.iter())
            .map(|r| r.medicine_name.as_str()),
    );

    println!("{}", "Dataset statistics:".cyan().bold());
    println!("  Training rows:   {}", train.len());
    println!("  Validation rows: {}", val.len());
    println!("  Testing rows:    {}", test.len());
    println!("  Vocabulary size: {}", vocab.len());

    Ok(())
}
