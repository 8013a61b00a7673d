use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::Encoder;
use crate::common::error::EncodeError;
use crate::modules::transcode::model::RenditionSpec;

const STDERR_TAIL_LINES: usize = 8;

#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    video_codec: String,
    audio_codec: String,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    pub fn args(&self, input: &Path, output: &Path, spec: &RenditionSpec) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(input.into());
        args.extend(
            [
                "-c:v".to_string(),
                self.video_codec.clone(),
                "-c:a".to_string(),
                self.audio_codec.clone(),
                "-s".to_string(),
                spec.size(),
                "-f".to_string(),
                "mp4".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        spec: &RenditionSpec,
    ) -> Result<(), EncodeError> {
        info!(rendition = %spec.name, "🎬 Encoding {}", spec.size());
        let args = self.args(input, output, spec);
        debug!("{} {:?}", self.binary.display(), args);

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(EncodeError::Spawn)?;

        if !result.status.success() {
            return Err(EncodeError::Failed {
                status: result.status.to_string(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
