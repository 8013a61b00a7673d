use serde::Deserialize;
use thiserror::Error;

/// Marker value S3 (and MinIO) put in the `Event` field of a connectivity probe.
pub const PROBE_EVENT: &str = "s3:TestEvent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub container: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub location: StoreLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEnvelope {
    Probe,
    Batch(Vec<AssetRecord>),
}

#[derive(Debug, Error)]
pub enum NotificationParseError {
    #[error("Message has no body")]
    EmptyBody,

    #[error("Malformed notification JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notification carries neither a probe marker nor records")]
    Unrecognized,

    #[error("Record {index} has an undecodable object key: {reason}")]
    BadKey { index: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Service")]
    service: Option<String>,
    #[serde(rename = "Event")]
    event: Option<String>,
    #[serde(rename = "Records")]
    records: Option<Vec<RawRecord>>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    s3: RawS3Entity,
}

#[derive(Debug, Deserialize)]
struct RawS3Entity {
    bucket: RawBucket,
    object: RawObject,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    key: String,
}

impl NotificationEnvelope {
    pub fn parse(body: &str) -> Result<Self, NotificationParseError> {
        if body.trim().is_empty() {
            return Err(NotificationParseError::EmptyBody);
        }

        let raw: RawEnvelope = serde_json::from_str(body)?;

        if raw.service.is_some() && raw.event.as_deref() == Some(PROBE_EVENT) {
            return Ok(Self::Probe);
        }

        let records = raw.records.ok_or(NotificationParseError::Unrecognized)?;
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let key = decode_object_key(&record.s3.object.key).map_err(|reason| {
                    NotificationParseError::BadKey { index, reason }
                })?;
                Ok(AssetRecord {
                    location: StoreLocation {
                        container: record.s3.bucket.name,
                        key,
                    },
                })
            })
            .collect::<Result<Vec<_>, NotificationParseError>>()?;

        Ok(Self::Batch(records))
    }
}

/// Object keys in bucket notifications are form-encoded: `+` is a space.
fn decode_object_key(raw: &str) -> Result<String, String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| e.to_string())
}
