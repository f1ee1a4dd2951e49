use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::error::StoreError;

/// Lifecycle of a job through the pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, executor not yet running
    Queued,

    /// Executor started, extracting audio
    Processing,

    /// WAV produced, transcribing
    AudioExtracted,

    /// Transcript recorded, summarizing
    Transcribed,

    /// Summary recorded, translating
    Summarized,

    /// Terminal success
    Done,

    /// Terminal failure
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::AudioExtracted => "audio_extracted",
            JobStatus::Transcribed => "transcribed",
            JobStatus::Summarized => "summarized",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted video and everything the pipeline has produced for it so far
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,

    /// Name of the file as uploaded by the client
    pub source_file_name: String,

    pub created_at: DateTime<Utc>,

    /// Set when the job enters `done` or `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Language code to translated summary. Keys are never overwritten.
    #[serde(default)]
    pub translations: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, source_file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            source_file_name: source_file_name.into(),
            created_at: Utc::now(),
            finished_at: None,
            transcript: None,
            summary: None,
            translations: BTreeMap::new(),
            error: None,
        }
    }

    /// Move to `status`, stamping `finished_at` on terminal states.
    pub fn advance(&mut self, status: JobStatus) {
        self.status = status;
        if status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn finish(&mut self) {
        self.advance(JobStatus::Done);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.advance(JobStatus::Error);
    }

    /// Insert a translation unless the language already has one.
    /// Returns `false` when an existing entry was kept.
    pub fn record_translation(&mut self, language: impl Into<String>, text: impl Into<String>) -> bool {
        match self.translations.entry(language.into()) {
            std::collections::btree_map::Entry::Occupied(_) => false,
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(text.into());
                true
            }
        }
    }
}

/// In-memory job table shared by the API and the executors.
///
/// Reads return snapshots; no lock is held across an await point. Terminal
/// jobs are immutable.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id));
        }
        debug!(job_id = %job.id, "job created");
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.read().get(id).cloned()
    }

    /// Apply `mutator` atomically and return the resulting snapshot.
    pub fn update<F>(&self, id: &str, mutator: F) -> Result<Job, StoreError>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::Unknown(id.to_string()))?;
        if job.status.is_terminal() {
            return Err(StoreError::Terminal(id.to_string()));
        }
        mutator(job);
        Ok(job.clone())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove terminal jobs that finished more than `ttl` ago.
    pub fn evict_expired(&self, ttl: chrono::Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished) if job.status.is_terminal() => finished > cutoff,
            _ => true,
        });
        before - jobs.len()
    }

    pub fn statistics(&self) -> JobStoreStats {
        let jobs = self.read();
        let mut stats = JobStoreStats {
            total_jobs: jobs.len(),
            ..JobStoreStats::default()
        };
        for job in jobs.values() {
            match job.status {
                JobStatus::Done => stats.completed_jobs += 1,
                JobStatus::Error => stats.failed_jobs += 1,
                _ => stats.active_jobs += 1,
            }
        }
        stats
    }
}

/// Job store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobStoreStats {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_snapshot() {
        let store = JobStore::new();
        store.create(Job::new("job_1", "talk.mp4")).unwrap();

        let job = store.get("job_1").unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.source_file_name, "talk.mp4");
        assert!(store.get("job_2").is_none());

        assert_eq!(
            store.create(Job::new("job_1", "again.mp4")),
            Err(StoreError::Duplicate("job_1".to_string()))
        );
    }

    #[test]
    fn test_terminal_jobs_reject_updates() {
        let store = JobStore::new();
        store.create(Job::new("job_1", "talk.mp4")).unwrap();

        let done = store.update("job_1", |job| job.finish()).unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert!(done.finished_at.is_some());

        let err = store
            .update("job_1", |job| job.summary = Some("late".to_string()))
            .unwrap_err();
        assert_eq!(err, StoreError::Terminal("job_1".to_string()));
        assert!(store.get("job_1").unwrap().summary.is_none());

        assert_eq!(
            store.update("missing", |_| {}),
            Err(StoreError::Unknown("missing".to_string()))
        );
    }

    #[test]
    fn test_translations_only_gain_keys() {
        let mut job = Job::new("job_1", "talk.mp4");
        assert!(job.record_translation("FR", "Bonjour"));
        assert!(!job.record_translation("FR", "Salut"));
        assert_eq!(job.translations["FR"], "Bonjour");
    }

    #[test]
    fn test_json_shape() {
        let mut job = Job::new("job_1", "talk.mp4");
        job.advance(JobStatus::AudioExtracted);
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["status"], "audio_extracted");
        assert_eq!(value["sourceFileName"], "talk.mp4");
        assert_eq!(value["translations"], serde_json::json!({}));
        assert!(value.get("error").is_none());
        assert!(value.get("finishedAt").is_none());
    }

    #[test]
    fn test_evict_expired_keeps_active_jobs() {
        let store = JobStore::new();
        store.create(Job::new("running", "a.mp4")).unwrap();
        store.create(Job::new("failed", "b.mp4")).unwrap();
        store.update("failed", |job| job.fail("boom")).unwrap();

        assert_eq!(store.evict_expired(chrono::Duration::hours(1)), 0);
        assert_eq!(store.evict_expired(chrono::Duration::seconds(-1)), 1);
        assert!(store.get("running").is_some());
        assert!(store.get("failed").is_none());

        let stats = store.statistics();
        assert_eq!(stats.total_jobs, 1);
        assert_eq!(stats.active_jobs, 1);
    }
}
