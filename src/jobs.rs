//! Job submission and status lookup.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{JobNotFound, ValidationError};
use crate::options::ProcessingOptions;
use crate::processing::PipelineExecutor;
use crate::state::{Job, JobStore};

/// A video already persisted to the upload directory
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name the client sent
    pub original_name: String,
    /// Where it was stored
    pub path: PathBuf,
}

/// Opaque, unguessable job identifier
pub fn new_job_id() -> String {
    format!("job_{}", Uuid::new_v4().simple())
}

/// Entry point for submissions and status queries
#[derive(Clone)]
pub struct JobService {
    store: Arc<JobStore>,
    executor: Arc<PipelineExecutor>,
}

impl JobService {
    pub fn new(executor: Arc<PipelineExecutor>) -> Self {
        Self {
            store: Arc::clone(executor.store()),
            executor,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Register a job and start its pipeline in the background.
    ///
    /// Returns as soon as the job is queued. Must be called from within a
    /// tokio runtime.
    pub fn submit(&self, upload: Option<UploadedFile>, options: ProcessingOptions) -> Result<String, ValidationError> {
        self.submit_with_handle(upload, options).map(|(id, _)| id)
    }

    /// Like [`submit`](Self::submit) but also hands back the pipeline task.
    pub fn submit_with_handle(
        &self,
        upload: Option<UploadedFile>,
        options: ProcessingOptions,
    ) -> Result<(String, JoinHandle<()>), ValidationError> {
        let upload = upload.ok_or(ValidationError::MissingFile)?;

        let job_id = new_job_id();
        self.store
            .create(Job::new(job_id.clone(), upload.original_name.clone()))
            .map_err(|e| ValidationError::Upload(e.to_string()))?;

        info!(job_id = %job_id, file = %upload.original_name, "📥 Job queued");

        let executor = Arc::clone(&self.executor);
        let store = Arc::clone(&self.store);
        let id = job_id.clone();
        let handle = tokio::spawn(async move {
            let run = executor.run(&id, &upload.path, &options);
            // The unwound future (and its drop guard) is gone by the end of this statement
            let outcome = AssertUnwindSafe(run).catch_unwind().await;
            if let Err(panic) = outcome {
                let message = panic_message(panic.as_ref());
                error!(job_id = %id, "💥 Pipeline panicked: {}", message);
                if let Err(e) = store.update(&id, |job| job.fail(format!("Internal error: {}", message))) {
                    warn!(job_id = %id, "Could not record panic: {}", e);
                }
            }
        });

        Ok((job_id, handle))
    }

    pub fn status(&self, job_id: &str) -> Result<Job, JobNotFound> {
        self.store.get(job_id).ok_or_else(|| JobNotFound(job_id.to_string()))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline panicked".to_string()
    }
}

/// Periodically evict finished jobs older than `retention`.
///
/// Returns `None` when retention is zero (jobs are kept for the process lifetime).
pub fn spawn_reaper(store: Arc<JobStore>, retention: Duration, interval: Duration) -> Option<JoinHandle<()>> {
    if retention.is_zero() {
        info!("🗄️  Job retention disabled, finished jobs are kept in memory");
        return None;
    }

    let ttl = chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::days(36_500));
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = store.evict_expired(ttl);
            if evicted > 0 {
                info!(evicted, remaining = store.len(), "🧹 Evicted expired jobs");
            } else {
                debug!(remaining = store.len(), "reaper sweep found nothing to evict");
            }
        }
    }))
}
