use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use super::dto::{UploadUrlQuery, UploadUrlResponse};
use super::service::{UploadError, UploadService};
use crate::common::response::ApiError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/upload/get-upload-url",
    params(UploadUrlQuery),
    responses(
        (status = 200, description = "Presigned upload URL", body = UploadUrlResponse),
        (status = 400, description = "Missing filename or contentType, or not a video type"),
        (status = 500, description = "Could not generate signed URL")
    ),
    tag = "Upload"
)]
pub async fn get_upload_url(
    State(state): State<AppState>,
    Query(query): Query<UploadUrlQuery>,
) -> impl IntoResponse {
    match UploadService::generate_upload_url(&state, query).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(UploadError::InvalidRequest(message)) => {
            ApiError(message, StatusCode::BAD_REQUEST).into_response()
        }
        Err(e) => {
            error!("Presign failed: {}", e);
            ApiError(
                "Could not generate signed URL".to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    }
}
