use std::path::Path;

use async_trait::async_trait;

use crate::common::error::EncodeError;
use crate::modules::transcode::model::RenditionSpec;

pub mod ffmpeg;

#[async_trait]
pub trait Encoder: Send + Sync {
    /// Produces `output` from `input` at the rendition's dimensions. Runs to
    /// completion; callers never cancel an encode in flight.
    async fn encode(&self, input: &Path, output: &Path, spec: &RenditionSpec)
        -> Result<(), EncodeError>;
}
