use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::pipeline::{BatchError, BatchOrchestrator};

/// Multipart field carrying the CSV.
const FILE_FIELD: &str = "file";

pub fn batches_routes() -> Router<Arc<BatchOrchestrator>> {
    Router::new().route("/", post(run_batch))
}

#[tracing::instrument(skip(orchestrator, multipart))]
async fn run_batch(
    State(orchestrator): State<Arc<BatchOrchestrator>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, BatchApiError> {
    let multipart = multipart.map_err(|e| BatchError::Upload(e.body_text()))?;
    let content = read_upload(multipart).await?;

    tracing::info!(bytes = content.len(), "Batch upload received");

    let report = orchestrator.run(content).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(report))).into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, BatchError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BatchError::Upload(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some(FILE_FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| BatchError::Upload(format!("Failed to read file bytes: {}", e)))?;
            return Ok(data.to_vec());
        }
    }

    Err(BatchError::Upload("No file uploaded".to_string()))
}

#[derive(Debug)]
struct BatchApiError(BatchError);

impl From<BatchError> for BatchApiError {
    fn from(err: BatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BatchApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            BatchError::Upload(_) => StatusCode::BAD_REQUEST,
            BatchError::Parse(_) | BatchError::StorageWrite { .. } | BatchError::Internal(_) => {
                tracing::error!("Batch failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            },
        };

        let error = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_is_bad_request() {
        let response = BatchApiError(BatchError::Upload("No file uploaded".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_pipeline_errors_are_server_errors() {
        for err in [
            BatchError::Parse("bad".into()),
            BatchError::storage("inputs/input_1.csv", anyhow::anyhow!("down")),
            BatchError::Internal("boom".into()),
        ] {
            let response = BatchApiError(err).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
