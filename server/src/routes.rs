//! HTTP route handlers
//!
//! Thin glue over the loaded predictor and drug table. A decode failure on
//! one request is that request's problem only: it maps to a client error and
//! the process keeps serving.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use medscript::utils::error::Error as MedscriptError;

use crate::state::SharedState;

/// Client- and server-side failures surfaced by the API
pub enum ApiError {
    /// The request carried no usable file part
    MissingFile,
    /// The uploaded bytes could not be decoded as a PNG image
    UndecodableImage(String),
    /// The requested medicine is not in the table
    MedicineNotFound,
    /// Anything else
    Internal(String),
}

impl From<MedscriptError> for ApiError {
    fn from(err: MedscriptError) -> Self {
        match err {
            MedscriptError::Decode(reason) => ApiError::UndecodableImage(reason),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "multipart field 'file' is required".to_string(),
            ),
            ApiError::UndecodableImage(reason) => {
                warn!("rejected upload: {}", reason);
                (StatusCode::UNPROCESSABLE_ENTITY, reason)
            }
            ApiError::MedicineNotFound => {
                (StatusCode::NOT_FOUND, "Medicine not found".to_string())
            }
            ApiError::Internal(reason) => {
                warn!("internal error: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, reason)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Health check endpoint
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "medscript inference service running" }))
}

/// Predict the medicine name on an uploaded word image.
///
/// Expects a multipart form with a `file` part holding PNG bytes.
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<medscript::inference::predictor::Prediction>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        let prediction = state.predictor.predict(&bytes)?;
        info!(
            "predicted '{}' at {:.1}% confidence",
            prediction.prediction,
            prediction.confidence * 100.0
        );
        return Ok(Json(prediction));
    }

    Err(ApiError::MissingFile)
}

/// Look up safety information for a medicine name
pub async fn medicine_info(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state
        .medicines
        .lookup(&name)
        .ok_or(ApiError::MedicineNotFound)?;

    Ok(Json(json!({
        "medicine": record.generic,
        "safety_info": record.info,
    })))
}
