//! Application state for the inference server
//!
//! All shared state is built once at startup and injected into handlers:
//! the loaded classifier and the drug-information table. Nothing here is
//! mutated after initialization, so handlers may read it concurrently.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use medscript::backend::{default_device, DefaultBackend};
use medscript::inference::predictor::Predictor;

use crate::drugs::MedicineDb;

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Model artifact stem (weights at `<stem>.mpk`, config at `<stem>.json`)
    pub model_path: PathBuf,
    /// Vocabulary file written by training
    pub vocab_path: PathBuf,
    /// Drug-information table (JSON)
    pub medicine_db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("output/models/best_crnn"),
            vocab_path: PathBuf::from("output/models/id2word.json"),
            medicine_db_path: PathBuf::from("data/medicine_data.json"),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// The loaded classifier
    pub predictor: Predictor<DefaultBackend>,
    /// Drug safety information and brand-name mapping
    pub medicines: MedicineDb,
}

impl AppState {
    /// Load every artifact the service needs.
    ///
    /// A missing or corrupt model, vocabulary or drug table is fatal: the
    /// service must not start serving without them.
    pub fn initialize(config: &ServerConfig) -> anyhow::Result<Self> {
        info!("Loading model from {:?}", config.model_path);
        let predictor = Predictor::load(
            &config.model_path,
            &config.vocab_path,
            default_device(),
        )
        .context("failed to load classifier artifacts")?;
        info!("Model loaded ({} classes)", predictor.num_classes());

        info!("Loading drug table from {:?}", config.medicine_db_path);
        let medicines = MedicineDb::load(&config.medicine_db_path)
            .context("failed to load drug-information table")?;
        info!(
            "Drug table loaded ({} generics, {} brands)",
            medicines.num_generics(),
            medicines.num_brands()
        );

        Ok(Self {
            predictor,
            medicines,
        })
    }
}

pub type SharedState = Arc<AppState>;
