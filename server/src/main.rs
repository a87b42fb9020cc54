//! MedScript inference server
//!
//! HTTP API over a trained prescription word classifier. Artifacts are
//! loaded once at startup; the process refuses to start without them.

mod drugs;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::state::{AppState, ServerConfig};

/// MedScript inference server
#[derive(Parser, Debug)]
#[command(name = "medscript-server")]
#[command(version)]
#[command(about = "HTTP inference service for handwritten prescription recognition")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Model artifact stem (weights at <stem>.mpk, config at <stem>.json)
    #[arg(long, env = "MEDSCRIPT_MODEL", default_value = "output/models/best_crnn")]
    model: PathBuf,

    /// Vocabulary file written by training
    #[arg(long, env = "MEDSCRIPT_VOCAB", default_value = "output/models/id2word.json")]
    vocab: PathBuf,

    /// Drug-information table (JSON)
    #[arg(long, env = "MEDSCRIPT_MEDICINE_DB", default_value = "data/medicine_data.json")]
    medicine_db: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    let config = ServerConfig {
        model_path: cli.model,
        vocab_path: cli.vocab,
        medicine_db_path: cli.medicine_db,
    };

    info!("MedScript inference server v{}", env!("CARGO_PKG_VERSION"));
    info!("  Model:    {:?}", config.model_path);
    info!("  Vocab:    {:?}", config.vocab_path);
    info!("  Drug DB:  {:?}", config.medicine_db_path);

    // Fail fast: no artifacts, no service
    let state = Arc::new(AppState::initialize(&config)?);

    let app = Router::new()
        .route("/", get(routes::health))
        .route("/predict", post(routes::predict))
        .route("/medicine/:name", get(routes::medicine_info))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
