//! Progress broadcaster: the single writer of job state changes.
//!
//! Every state change does two things, in order:
//! 1. updates the durable job record, unconditionally;
//! 2. emits a progress event to currently-subscribed push observers, best
//!    effort (lossy, at-most-once — pull via the store stays authoritative).
//!
//! The two sinks are independent: a slow or absent observer never gates the
//! store write, and a store write never waits on event delivery.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::jobs::{AgentPhase, Job, JobStatus, JobStore, JobStoreError};
use super::stream_hub::StreamHub;
use crate::common::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEventType {
    JobStarted,
    AgentUpdate,
    JobCompleted,
    JobFailed,
}

impl ProgressEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressEventType::JobStarted => "job_started",
            ProgressEventType::AgentUpdate => "agent_update",
            ProgressEventType::JobCompleted => "job_completed",
            ProgressEventType::JobFailed => "job_failed",
        }
    }
}

pub struct ProgressBroadcaster {
    store: Arc<dyn JobStore>,
    hub: StreamHub,
}

impl ProgressBroadcaster {
    pub fn new(store: Arc<dyn JobStore>, hub: StreamHub) -> Self {
        Self { store, hub }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    async fn emit(&self, job_id: Uuid, event_type: ProgressEventType, data: serde_json::Value) {
        let event = json!({
            "job_id": job_id,
            "event_type": event_type.as_str(),
            "data": data,
            "timestamp": Utc::now(),
        });
        self.hub.publish(job_id, event).await;
    }

    /// `queued → running`, on first domain dispatch.
    pub async fn job_started(&self, job_id: Uuid, query: &str) -> Result<Job, JobStoreError> {
        let job = self
            .store
            .update(
                job_id,
                Box::new(|job| {
                    job.set_status(JobStatus::Running);
                    job.set_progress(10);
                }),
            )
            .await?;
        self.emit(job_id, ProgressEventType::JobStarted, json!({ "query": query }))
            .await;
        Ok(job)
    }

    pub async fn agent_running(&self, job_id: Uuid, domain: Domain) -> Result<(), JobStoreError> {
        self.store
            .update(
                job_id,
                Box::new(move |job| {
                    job.update_agent(domain, AgentPhase::Running, None, None);
                }),
            )
            .await?;
        self.emit(
            job_id,
            ProgressEventType::AgentUpdate,
            json!({ "agent": domain.agent_name(), "status": "running" }),
        )
        .await;
        Ok(())
    }

    /// Record a domain's resolution. `result_count` is set, not incremented,
    /// and progress is recomputed from agent states, so replays are no-ops.
    pub async fn agent_completed(
        &self,
        job_id: Uuid,
        domain: Domain,
        result_count: usize,
        note: Option<String>,
    ) -> Result<(), JobStoreError> {
        self.store
            .update(
                job_id,
                Box::new(move |job| {
                    job.update_agent(domain, AgentPhase::Completed, Some(result_count), note);
                    let progress = job.fanout_progress();
                    job.set_progress(progress);
                }),
            )
            .await?;
        self.emit(
            job_id,
            ProgressEventType::AgentUpdate,
            json!({
                "agent": domain.agent_name(),
                "status": "completed",
                "result_count": result_count,
            }),
        )
        .await;
        Ok(())
    }

    pub async fn agent_failed(
        &self,
        job_id: Uuid,
        domain: Domain,
        error: String,
    ) -> Result<(), JobStoreError> {
        let event_error = error.clone();
        self.store
            .update(
                job_id,
                Box::new(move |job| {
                    job.update_agent(domain, AgentPhase::Failed, Some(0), Some(error));
                    let progress = job.fanout_progress();
                    job.set_progress(progress);
                }),
            )
            .await?;
        self.emit(
            job_id,
            ProgressEventType::AgentUpdate,
            json!({
                "agent": domain.agent_name(),
                "status": "failed",
                "error": event_error,
            }),
        )
        .await;
        Ok(())
    }

    /// Raise overall progress to an absolute milestone.
    pub async fn progress(&self, job_id: Uuid, progress: u8) -> Result<(), JobStoreError> {
        self.store
            .update(job_id, Box::new(move |job| job.set_progress(progress)))
            .await?;
        Ok(())
    }

    /// `running → completed`, with terminal summary data for observers.
    pub async fn job_completed(
        &self,
        job_id: Uuid,
        data: serde_json::Value,
    ) -> Result<(), JobStoreError> {
        self.store
            .update(
                job_id,
                Box::new(|job| {
                    // Progress first: once the status goes terminal the job
                    // stops accepting mutations.
                    job.set_progress(100);
                    job.set_status(JobStatus::Completed);
                }),
            )
            .await?;
        self.emit(job_id, ProgressEventType::JobCompleted, data).await;
        Ok(())
    }

    /// `running → failed`. Only internal orchestration faults land here;
    /// provider and domain failures are absorbed upstream.
    pub async fn job_failed(&self, job_id: Uuid, error: String) -> Result<(), JobStoreError> {
        let event_error = error.clone();
        self.store
            .update(
                job_id,
                Box::new(move |job| {
                    // Only record the error on an actual transition; a job
                    // already terminal keeps its record untouched.
                    if job.set_status(JobStatus::Failed) {
                        job.error = Some(error);
                    }
                }),
            )
            .await?;
        self.emit(
            job_id,
            ProgressEventType::JobFailed,
            json!({ "error": event_error }),
        )
        .await;
        Ok(())
    }
}
