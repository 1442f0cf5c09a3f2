//! Job store with per-job serialized mutations.
//!
//! [`LocalJobStore`] keeps jobs in memory behind one `tokio::Mutex` per job,
//! so all mutations for a given job id are single-writer while different jobs
//! proceed independently. Each committed mutation is snapshotted to disk as
//! one JSON file per job (best effort), which is enough for a poll request to
//! reconstruct state after a process restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::job::Job;
use crate::common::{AnalysisResult, ApiError};

/// A state transition applied under the job's lock.
///
/// Mutations must be idempotent: they set fields (or derive them from job
/// state) rather than increment, so a replayed event cannot double-count.
pub type JobMutation = Box<dyn FnOnce(&mut Job) + Send>;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<JobStoreError> for ApiError {
    fn from(e: JobStoreError) -> Self {
        match e {
            JobStoreError::NotFound(id) => ApiError::JobNotFound(id),
            JobStoreError::Internal(e) => ApiError::Internal(e),
        }
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a queued job for the query.
    async fn create(&self, query: &str) -> Result<Job, JobStoreError>;

    /// Fetch the current job record.
    async fn get(&self, id: Uuid) -> Result<Job, JobStoreError>;

    /// Apply an atomic, serialized mutation and return the updated record.
    async fn update(&self, id: Uuid, mutation: JobMutation) -> Result<Job, JobStoreError>;

    /// Persist the terminal analysis result for a completed job.
    async fn save_result(&self, id: Uuid, result: &AnalysisResult) -> Result<(), JobStoreError>;

    /// Fetch the terminal analysis result, if the job produced one.
    async fn result(&self, id: Uuid) -> Result<Option<AnalysisResult>, JobStoreError>;
}

pub struct LocalJobStore {
    jobs: RwLock<HashMap<Uuid, Arc<Mutex<Job>>>>,
    results: RwLock<HashMap<Uuid, AnalysisResult>>,
    data_dir: Option<PathBuf>,
}

impl LocalJobStore {
    /// In-memory only store, used by tests.
    pub fn ephemeral() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            results: RwLock::new(HashMap::new()),
            data_dir: None,
        }
    }

    /// Open a store rooted at `dir`, reloading any snapshots found there.
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create job data dir {}", dir.display()))?;

        let mut jobs = HashMap::new();
        let mut results = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".json") {
                continue;
            }
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable snapshot");
                    continue;
                }
            };
            if name.ends_with("_result.json") {
                match serde_json::from_slice::<AnalysisResult>(&bytes) {
                    Ok(result) => {
                        results.insert(result.job_id, result);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping corrupt result snapshot");
                    }
                }
            } else {
                match serde_json::from_slice::<Job>(&bytes) {
                    Ok(job) => {
                        jobs.insert(job.id, Arc::new(Mutex::new(job)));
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping corrupt job snapshot");
                    }
                }
            }
        }
        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), dir = %dir.display(), "reloaded job snapshots");
        }

        Ok(Self {
            jobs: RwLock::new(jobs),
            results: RwLock::new(results),
            data_dir: Some(dir),
        })
    }

    async fn handle(&self, id: Uuid) -> Result<Arc<Mutex<Job>>, JobStoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(JobStoreError::NotFound(id))
    }

    /// Snapshot failures are logged and swallowed: durability here is best
    /// effort and must never stall or fail a mutation.
    async fn persist(&self, job: &Job) {
        let Some(dir) = &self.data_dir else { return };
        let path = dir.join(format!("{}.json", job.id));
        match serde_json::to_vec_pretty(job) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    tracing::warn!(job_id = %job.id, error = %e, "failed to snapshot job");
                }
            }
            Err(e) => tracing::warn!(job_id = %job.id, error = %e, "failed to serialize job"),
        }
    }

    async fn persist_result(&self, result: &AnalysisResult) {
        let Some(dir) = &self.data_dir else { return };
        let path = dir.join(format!("{}_result.json", result.job_id));
        match serde_json::to_vec_pretty(result) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    tracing::warn!(job_id = %result.job_id, error = %e, "failed to snapshot result");
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %result.job_id, error = %e, "failed to serialize result")
            }
        }
    }
}

#[async_trait]
impl JobStore for LocalJobStore {
    async fn create(&self, query: &str) -> Result<Job, JobStoreError> {
        let job = Job::new(query);
        self.jobs
            .write()
            .await
            .insert(job.id, Arc::new(Mutex::new(job.clone())));
        self.persist(&job).await;
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Job, JobStoreError> {
        let handle = self.handle(id).await?;
        let job = handle.lock().await;
        Ok(job.clone())
    }

    async fn update(&self, id: Uuid, mutation: JobMutation) -> Result<Job, JobStoreError> {
        let handle = self.handle(id).await?;
        let mut job = handle.lock().await;
        let was_terminal = job.status.is_terminal();
        mutation(&mut job);
        if !was_terminal {
            job.updated_at = chrono::Utc::now();
        }
        // Snapshot while still holding the lock so disk order matches
        // commit order.
        self.persist(&job).await;
        Ok(job.clone())
    }

    async fn save_result(&self, id: Uuid, result: &AnalysisResult) -> Result<(), JobStoreError> {
        // Results only exist for known jobs.
        self.handle(id).await?;
        self.results.write().await.insert(id, result.clone());
        self.persist_result(result).await;
        Ok(())
    }

    async fn result(&self, id: Uuid) -> Result<Option<AnalysisResult>, JobStoreError> {
        Ok(self.results.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::jobs::job::JobStatus;

    #[tokio::test]
    async fn create_then_get_roundtrip() {
        let store = LocalJobStore::ephemeral();
        let job = store.create("tuberculosis treatment landscape").await.unwrap();
        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = LocalJobStore::ephemeral();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.get(id).await,
            Err(JobStoreError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            store.update(id, Box::new(|_| {})).await,
            Err(JobStoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_updates_are_all_applied() {
        let store = Arc::new(LocalJobStore::ephemeral());
        let job = store.create("q").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50u8 {
            let store = store.clone();
            let id = job.id;
            handles.push(tokio::spawn(async move {
                store
                    .update(id, Box::new(move |job| job.set_progress(i.min(70))))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.progress, 49);
    }

    #[tokio::test]
    async fn snapshot_on_disk_matches_memory_after_concurrent_updates() {
        let dir = std::env::temp_dir().join(format!("jobstore-test-{}", Uuid::new_v4()));
        let store = Arc::new(LocalJobStore::open(&dir).unwrap());
        let job = store.create("q").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..50u8 {
            let store = store.clone();
            let id = job.id;
            handles.push(tokio::spawn(async move {
                store
                    .update(id, Box::new(move |job| job.set_progress(i)))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let in_memory = store.get(job.id).await.unwrap();
        assert_eq!(in_memory.progress, 49);

        // The last snapshot written must be the last commit, not a stale
        // intermediate one.
        let reopened = LocalJobStore::open(&dir).unwrap();
        let from_disk = reopened.get(job.id).await.unwrap();
        assert_eq!(from_disk.progress, in_memory.progress);
        assert_eq!(from_disk.updated_at, in_memory.updated_at);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn terminal_job_keeps_its_updated_at() {
        let store = LocalJobStore::ephemeral();
        let job = store.create("q").await.unwrap();
        store
            .update(
                job.id,
                Box::new(|job| {
                    job.set_status(JobStatus::Running);
                    job.set_progress(100);
                    job.set_status(JobStatus::Completed);
                }),
            )
            .await
            .unwrap();
        let completed = store.get(job.id).await.unwrap();

        store
            .update(job.id, Box::new(|job| job.set_progress(10)))
            .await
            .unwrap();

        let after = store.get(job.id).await.unwrap();
        assert_eq!(after.updated_at, completed.updated_at);
        assert_eq!(after.progress, 100);
    }

    #[tokio::test]
    async fn snapshots_survive_reopen() {
        let dir = std::env::temp_dir().join(format!("jobstore-test-{}", Uuid::new_v4()));
        let id = {
            let store = LocalJobStore::open(&dir).unwrap();
            let job = store.create("asthma biologics pipeline").await.unwrap();
            store
                .update(
                    job.id,
                    Box::new(|job| {
                        job.set_status(JobStatus::Running);
                        job.set_progress(30);
                    }),
                )
                .await
                .unwrap();
            job.id
        };

        let reopened = LocalJobStore::open(&dir).unwrap();
        let job = reopened.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 30);

        std::fs::remove_dir_all(&dir).ok();
    }
}
