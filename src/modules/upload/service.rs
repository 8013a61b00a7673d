use thiserror::Error;
use time::OffsetDateTime;

use super::dto::{UploadUrlQuery, UploadUrlResponse};
use crate::common::error::StorageError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct UploadService;

impl UploadService {
    /// `{unix millis}-{filename}`. Everything before the first `-` is the job
    /// id the transcoder derives, so the prefix must never contain one.
    pub fn object_key(filename: &str, now: OffsetDateTime) -> String {
        let millis = now.unix_timestamp_nanos() / 1_000_000;
        format!("{}-{}", millis, filename)
    }

    fn validate(query: UploadUrlQuery) -> Result<(String, String), UploadError> {
        let (Some(filename), Some(content_type)) = (
            query.filename.filter(|f| !f.trim().is_empty()),
            query.content_type.filter(|c| !c.trim().is_empty()),
        ) else {
            return Err(UploadError::InvalidRequest(
                "Missing filename or contentType".to_string(),
            ));
        };

        if filename.contains('/') || filename.contains('\\') {
            return Err(UploadError::InvalidRequest(
                "filename must not contain path separators".to_string(),
            ));
        }

        let mime: mime::Mime = content_type
            .parse()
            .map_err(|_| UploadError::InvalidRequest(format!("Invalid contentType: {}", content_type)))?;
        if mime.type_() != mime::VIDEO {
            return Err(UploadError::InvalidRequest(
                "Invalid content type: only video/* allowed".to_string(),
            ));
        }

        Ok((filename, content_type))
    }

    pub async fn generate_upload_url(
        state: &AppState,
        query: UploadUrlQuery,
    ) -> Result<UploadUrlResponse, UploadError> {
        let (filename, content_type) = Self::validate(query)?;
        let key = Self::object_key(&filename, OffsetDateTime::now_utc());

        let upload_url = state
            .storage
            .presign_put(
                &state.config.upload_bucket,
                &key,
                &content_type,
                state.config.upload_url_expiry,
            )
            .await?;

        Ok(UploadUrlResponse { upload_url, key })
    }
}
