//! Route handlers

use axum::extract::multipart::Field;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use tracing::{debug, info};

use common::error::Error;
use common::models::{HealthResponse, PredictionResponse};
use common::utils::{format_bytes, format_duration, measure_execution_time};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{ensure_image_content_type, FILE_FIELD};

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        debug!("Body is not a multipart form: {}", rejection);
        Error::MissingField(FILE_FIELD.to_string())
    })?;
    
    let bytes = read_image_field(multipart).await?;
    debug!("Received {} upload", format_bytes(bytes.len() as u64));
    
    let classifier = state.classifier.clone();
    let preprocessor = state.preprocessor;
    let (probabilities, elapsed) = tokio::task::spawn_blocking(move || {
        measure_execution_time(|| {
            let image = preprocessor.preprocess(&bytes)?;
            classifier.classify(&image)
        })
    })
    .await
    .map_err(|e| Error::Internal(format!("inference task failed: {}", e)))??;
    
    let prediction = state.labels.to_prediction(probabilities)?;
    info!("Predicted {} in {}", prediction.class_label, format_duration(elapsed));
    
    Ok(Json(prediction))
}

/// Finds the `file` field, checks its content type and reads it
async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, Error> {
    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        
        ensure_image_content_type(field.content_type())?;
        return read_field(field).await;
    }
    
    Err(Error::MissingField(FILE_FIELD.to_string()))
}

async fn read_field(field: Field<'_>) -> Result<Bytes, Error> {
    field.bytes().await.map_err(invalid_multipart)
}

fn invalid_multipart(err: axum::extract::multipart::MultipartError) -> Error {
    Error::InvalidArgument(format!("Invalid multipart body: {}", err))
}
