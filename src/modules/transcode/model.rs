use std::fmt;
use std::path::{Path, PathBuf};

use super::events::StoreLocation;
use crate::common::error::ConfigError;

pub const OUTPUT_EXTENSION: &str = "mp4";
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl RenditionSpec {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }

    pub fn size(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("360p", 480, 360),
            Self::new("480p", 858, 480),
            Self::new("720p", 1280, 720),
        ]
    }

    /// Parses `name:WxH` entries separated by commas, e.g. `360p:480x360,720p:1280x720`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ConfigError> {
        let invalid = |reason: String| ConfigError::invalid("RENDITIONS", reason);

        let mut specs: Vec<Self> = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, size) = entry
                .split_once(':')
                .ok_or_else(|| invalid(format!("`{}` is not name:WxH", entry)))?;
            let (width, height) = size
                .split_once('x')
                .ok_or_else(|| invalid(format!("`{}` is not WxH", size)))?;
            let width: u32 = width
                .trim()
                .parse()
                .map_err(|_| invalid(format!("bad width in `{}`", entry)))?;
            let height: u32 = height
                .trim()
                .parse()
                .map_err(|_| invalid(format!("bad height in `{}`", entry)))?;
            let name = name.trim();

            if name.is_empty() || width == 0 || height == 0 {
                return Err(invalid(format!("`{}` has an empty name or zero size", entry)));
            }
            if specs.iter().any(|s| s.name == name) {
                return Err(invalid(format!("duplicate rendition `{}`", name)));
            }
            specs.push(Self::new(name, width, height));
        }

        if specs.is_empty() {
            return Err(invalid("no renditions listed".to_string()));
        }
        Ok(specs)
    }
}

/// Everything a worker invocation knows about its job. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: String,
    pub source: StoreLocation,
    pub output_container: String,
}

impl JobContext {
    /// The job id is the part of the source key before its first `-`,
    /// or the whole key when there is none.
    pub fn new(source: StoreLocation, output_container: impl Into<String>) -> Result<Self, ConfigError> {
        let job_id = source
            .key
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();

        if job_id.is_empty() {
            return Err(ConfigError::invalid(
                "SOURCE_KEY",
                format!("cannot derive a job id from `{}`", source.key),
            ));
        }

        let output_container = output_container.into();
        if output_container.is_empty() {
            return Err(ConfigError::Missing("OUTPUT_CONTAINER"));
        }

        Ok(Self {
            job_id,
            source,
            output_container,
        })
    }

    pub fn output_key(&self, spec: &RenditionSpec) -> String {
        format!("{}-video-{}.{}", self.job_id, spec.name, OUTPUT_EXTENSION)
    }

    pub fn local_output_path(&self, work_dir: &Path, spec: &RenditionSpec) -> PathBuf {
        work_dir.join(flatten_key(&self.output_key(spec)))
    }

    pub fn staged_source_path(&self, work_dir: &Path) -> PathBuf {
        let extension = Path::new(&self.source.key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        work_dir.join(format!("{}-source.{}", flatten_key(&self.job_id), extension))
    }
}

fn flatten_key(key: &str) -> String {
    key.replace('/', "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenditionStatus {
    Pending,
    Encoding,
    Uploading,
    Done,
    Failed,
}

impl RenditionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RenditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Encoding => "encoding",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct RenditionResult {
    pub spec: RenditionSpec,
    pub status: RenditionStatus,
    pub output_key: String,
    pub error: Option<String>,
}

impl RenditionResult {
    pub fn pending(spec: RenditionSpec, output_key: String) -> Self {
        Self {
            spec,
            status: RenditionStatus::Pending,
            output_key,
            error: None,
        }
    }

    /// Moves forward along Pending -> Encoding -> Uploading -> Done.
    /// Terminal states never change.
    pub fn advance(&mut self, next: RenditionStatus) {
        if self.status.is_terminal() {
            return;
        }
        self.status = next;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = RenditionStatus::Failed;
        self.error = Some(reason.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    PartiallyFailed,
}

impl JobOutcome {
    pub fn aggregate(results: &[RenditionResult]) -> Self {
        if results.iter().all(|r| r.status == RenditionStatus::Done) {
            Self::Succeeded
        } else {
            Self::PartiallyFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(key: &str) -> JobContext {
        JobContext::new(
            StoreLocation {
                container: "uploads".to_string(),
                key: key.to_string(),
            },
            "renditions",
        )
        .unwrap()
    }

    #[test]
    fn job_id_is_key_prefix_before_first_dash() {
        let ctx = ctx("1690000000000-sample-clip.mp4");
        assert_eq!(ctx.job_id, "1690000000000");
        assert_eq!(
            ctx.output_key(&RenditionSpec::new("360p", 480, 360)),
            "1690000000000-video-360p.mp4"
        );
    }

    #[test]
    fn key_without_dash_is_its_own_job_id() {
        assert_eq!(ctx("movie.mp4").job_id, "movie.mp4");
    }

    #[test]
    fn leading_dash_is_rejected() {
        let err = JobContext::new(
            StoreLocation {
                container: "uploads".to_string(),
                key: "-sample.mp4".to_string(),
            },
            "renditions",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SOURCE_KEY", .. }));
    }

    #[test]
    fn local_paths_stay_inside_work_dir() {
        let ctx = ctx("incoming/1690000000000-sample.mp4");
        let dir = Path::new("/work");
        let spec = RenditionSpec::new("720p", 1280, 720);
        assert_eq!(ctx.output_key(&spec), "incoming/1690000000000-video-720p.mp4");
        assert_eq!(
            ctx.local_output_path(dir, &spec),
            PathBuf::from("/work/incoming_1690000000000-video-720p.mp4")
        );
        assert_eq!(
            ctx.staged_source_path(dir),
            PathBuf::from("/work/incoming_1690000000000-source.mp4")
        );
    }

    #[test]
    fn rendition_list_parses_and_rejects_bad_entries() {
        let specs = RenditionSpec::parse_list("360p:480x360, 1080p:1920x1080").unwrap();
        assert_eq!(specs, vec![
            RenditionSpec::new("360p", 480, 360),
            RenditionSpec::new("1080p", 1920, 1080),
        ]);

        assert!(RenditionSpec::parse_list("360p").is_err());
        assert!(RenditionSpec::parse_list("360p:480by360").is_err());
        assert!(RenditionSpec::parse_list("360p:0x360").is_err());
        assert!(RenditionSpec::parse_list("a:2x2,a:4x4").is_err());
        assert!(RenditionSpec::parse_list(" , ").is_err());
    }

    #[test]
    fn terminal_states_are_sticky() {
        let spec = RenditionSpec::new("360p", 480, 360);
        let mut result = RenditionResult::pending(spec, "k".to_string());
        result.advance(RenditionStatus::Encoding);
        result.fail("boom");
        result.advance(RenditionStatus::Done);
        assert_eq!(result.status, RenditionStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn outcome_requires_every_rendition_done() {
        let done = |name: &str| {
            let mut r = RenditionResult::pending(RenditionSpec::new(name, 2, 2), name.to_string());
            r.advance(RenditionStatus::Done);
            r
        };
        let mut failed = done("720p");
        failed.status = RenditionStatus::Failed;

        assert_eq!(JobOutcome::aggregate(&[done("360p"), done("480p")]), JobOutcome::Succeeded);
        assert_eq!(
            JobOutcome::aggregate(&[done("360p"), failed]),
            JobOutcome::PartiallyFailed
        );
    }

    #[test]
    fn status_displays_as_stage_name() {
        assert_eq!(RenditionStatus::Encoding.to_string(), "encoding");
        assert_eq!(RenditionStatus::Uploading.to_string(), "uploading");
    }
}
