use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::common::error::{EncodeError, StorageError};
use crate::infrastructure::encoder::Encoder;
use crate::infrastructure::storage::ObjectStore;
use crate::modules::transcode::model::{
    JobContext, JobOutcome, OUTPUT_CONTENT_TYPE, RenditionResult, RenditionSpec, RenditionStatus,
};

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("No renditions configured")]
    NoRenditions,

    #[error("Failed to prepare work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch source {container}/{key}: {source}")]
    Fetch {
        container: String,
        key: String,
        #[source]
        source: StorageError,
    },
}

#[derive(Debug, Error)]
enum RenditionError {
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    Removed,
    Missing,
    Failed(String),
}

#[derive(Debug)]
pub struct JobReport {
    pub outcome: JobOutcome,
    pub results: Vec<RenditionResult>,
    pub source_deleted: bool,
    pub source_delete_error: Option<String>,
    pub cleanup: Vec<(PathBuf, CleanupStatus)>,
}

impl JobReport {
    /// 0: all renditions published and source removed. 2: partial failure,
    /// source retained. 3: all published but the source could not be removed.
    pub fn exit_code(&self) -> u8 {
        match (self.outcome, self.source_deleted) {
            (JobOutcome::Succeeded, true) => 0,
            (JobOutcome::PartiallyFailed, _) => 2,
            (JobOutcome::Succeeded, false) => 3,
        }
    }

    pub fn cleanup_status(&self, path: &Path) -> Option<&CleanupStatus> {
        self.cleanup
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, status)| status)
    }
}

/// Runs one job: fetch, fan out one task per rendition, settle all, then
/// decide the source's fate and clean up local files.
pub struct Transcoder {
    store: Arc<dyn ObjectStore>,
    encoder: Arc<dyn Encoder>,
    renditions: Vec<RenditionSpec>,
    work_dir: PathBuf,
}

impl Transcoder {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        encoder: Arc<dyn Encoder>,
        renditions: Vec<RenditionSpec>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            encoder,
            renditions,
            work_dir: work_dir.into(),
        }
    }

    pub async fn run(&self, job: Arc<JobContext>) -> Result<JobReport, TranscodeError> {
        let span = info_span!("job", job_id = %job.job_id);
        self.run_job(job).instrument(span).await
    }

    async fn run_job(&self, job: Arc<JobContext>) -> Result<JobReport, TranscodeError> {
        info!(
            "🎥 Processing s3://{}/{} into {} rendition(s)",
            job.source.container,
            job.source.key,
            self.renditions.len()
        );

        // An empty set would aggregate to Succeeded and delete the only copy
        if self.renditions.is_empty() {
            error!("❌ No renditions configured, leaving the source untouched");
            return Err(TranscodeError::NoRenditions);
        }

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|source| TranscodeError::WorkDir {
                path: self.work_dir.clone(),
                source,
            })?;

        // 1. Fetch
        let staged = job.staged_source_path(&self.work_dir);
        if let Err(source) = self
            .store
            .download_to_file(&job.source.container, &job.source.key, &staged)
            .await
        {
            error!("❌ Fetch failed, no renditions attempted: {}", source);
            remove_local(staged).await;
            return Err(TranscodeError::Fetch {
                container: job.source.container.clone(),
                key: job.source.key.clone(),
                source,
            });
        }

        // 2. Fan out
        let handles: Vec<_> = self
            .renditions
            .iter()
            .cloned()
            .map(|spec| {
                let unit = RenditionUnit {
                    store: self.store.clone(),
                    encoder: self.encoder.clone(),
                    job: job.clone(),
                    input: staged.clone(),
                    output: job.local_output_path(&self.work_dir, &spec),
                    spec,
                };
                let span = info_span!("rendition", rendition = %unit.spec.name);
                tokio::spawn(unit.run().instrument(span))
            })
            .collect();

        // 3. Join: every unit settles, none is cancelled
        let settled = join_all(handles).await;
        let results: Vec<RenditionResult> = settled
            .into_iter()
            .zip(&self.renditions)
            .map(|(joined, spec)| {
                joined.unwrap_or_else(|e| {
                    error!(rendition = %spec.name, "Rendition task aborted: {}", e);
                    let mut result = RenditionResult::pending(spec.clone(), job.output_key(spec));
                    result.fail(format!("task aborted: {}", e));
                    result
                })
            })
            .collect();

        let outcome = JobOutcome::aggregate(&results);

        // 4. Source is removed only when every rendition is published
        let (source_deleted, source_delete_error) = match outcome {
            JobOutcome::Succeeded => match self
                .store
                .delete_object(&job.source.container, &job.source.key)
                .await
            {
                Ok(()) => (true, None),
                Err(e) => {
                    error!("❌ Renditions published but source removal failed: {}", e);
                    (false, Some(e.to_string()))
                }
            },
            JobOutcome::PartiallyFailed => {
                let failed: Vec<&str> = results
                    .iter()
                    .filter(|r| r.status == RenditionStatus::Failed)
                    .map(|r| r.spec.name.as_str())
                    .collect();
                warn!(
                    "⚠️ Renditions failed: {}. Keeping s3://{}/{} for a re-run",
                    failed.join(", "),
                    job.source.container,
                    job.source.key
                );
                (false, None)
            }
        };

        // 5. Local cleanup, whatever the outcome
        info!("🧹 Cleaning up local files");
        let mut paths = vec![staged];
        paths.extend(
            self.renditions
                .iter()
                .map(|spec| job.local_output_path(&self.work_dir, spec)),
        );
        let statuses = join_all(paths.iter().cloned().map(remove_local)).await;
        let cleanup = paths.into_iter().zip(statuses).collect();

        match outcome {
            JobOutcome::Succeeded => info!("✅ Job completed: {} rendition(s) published", results.len()),
            JobOutcome::PartiallyFailed => warn!("Job finished with failures"),
        }

        Ok(JobReport {
            outcome,
            results,
            source_deleted,
            source_delete_error,
            cleanup,
        })
    }
}

struct RenditionUnit {
    store: Arc<dyn ObjectStore>,
    encoder: Arc<dyn Encoder>,
    job: Arc<JobContext>,
    input: PathBuf,
    output: PathBuf,
    spec: RenditionSpec,
}

impl RenditionUnit {
    async fn run(self) -> RenditionResult {
        let mut result = RenditionResult::pending(self.spec.clone(), self.job.output_key(&self.spec));

        if let Err(e) = self.execute(&mut result).await {
            error!("❌ Failed while {}: {}", result.status, e);
            result.fail(e.to_string());
        }
        result
    }

    async fn execute(&self, result: &mut RenditionResult) -> Result<(), RenditionError> {
        result.advance(RenditionStatus::Encoding);
        self.encoder
            .encode(&self.input, &self.output, &self.spec)
            .await?;

        result.advance(RenditionStatus::Uploading);
        self.store
            .upload_file(
                &self.job.output_container,
                &result.output_key,
                &self.output,
                OUTPUT_CONTENT_TYPE,
            )
            .await?;

        result.advance(RenditionStatus::Done);
        info!("Uploaded {}", result.output_key);
        Ok(())
    }
}

/// Removing an already-missing file is not an error.
async fn remove_local(path: PathBuf) -> CleanupStatus {
    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            debug!("{} deleted", path.display());
            CleanupStatus::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} not found, nothing to remove", path.display());
            CleanupStatus::Missing
        }
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            CleanupStatus::Failed(e.to_string())
        }
    }
}
