//! Job model and lifecycle state machine.
//!
//! A job moves `queued → running → {completed | failed}` and never backwards;
//! progress is monotonic non-decreasing; agent updates are set-based so a
//! replayed event cannot double-count results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

impl AgentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentPhase::Completed | AgentPhase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Running => "running",
            AgentPhase::Completed => "completed",
            AgentPhase::Failed => "failed",
        }
    }
}

/// Per-domain worker status, one entry per domain per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub name: String,
    pub status: AgentPhase,
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentState {
    fn idle(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: AgentPhase::Idle,
            result_count: 0,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Durable per-job record. Owned by the job store; mutated only through
/// serialized update operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: Uuid,
    pub query: String,
    pub status: JobStatus,
    /// 0–100, monotonic non-decreasing.
    pub progress: u8,
    pub agents: Vec<AgentState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(query: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            status: JobStatus::Queued,
            progress: 0,
            agents: Domain::ALL
                .iter()
                .map(|d| AgentState::idle(d.agent_name()))
                .collect(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the lifecycle state. Returns false (and leaves the job
    /// untouched) for no-op or backwards transitions; terminal states are
    /// immutable.
    pub fn set_status(&mut self, next: JobStatus) -> bool {
        if self.status == next || self.status.is_terminal() || next.rank() <= self.status.rank() {
            return false;
        }
        self.status = next;
        true
    }

    /// Raise progress, never lowering it. Values are clamped to 100, and a
    /// terminal job keeps whatever progress it ended with.
    pub fn set_progress(&mut self, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
    }

    pub fn agent_mut(&mut self, domain: Domain) -> Option<&mut AgentState> {
        let name = domain.agent_name();
        self.agents.iter_mut().find(|a| a.name == name)
    }

    pub fn agent(&self, domain: Domain) -> Option<&AgentState> {
        let name = domain.agent_name();
        self.agents.iter().find(|a| a.name == name)
    }

    /// Set-based agent update: replaying the same update is a no-op, and a
    /// terminal job rejects the update entirely.
    pub fn update_agent(
        &mut self,
        domain: Domain,
        status: AgentPhase,
        result_count: Option<usize>,
        error: Option<String>,
    ) {
        if self.status.is_terminal() {
            return;
        }
        let now = Utc::now();
        if let Some(agent) = self.agent_mut(domain) {
            agent.status = status;
            if let Some(count) = result_count {
                agent.result_count = count;
            }
            if error.is_some() {
                agent.error = error;
            }
            if status == AgentPhase::Running && agent.started_at.is_none() {
                agent.started_at = Some(now);
            }
            if status.is_terminal() && agent.finished_at.is_none() {
                agent.finished_at = Some(now);
            }
        }
    }

    /// Progress derived from agent states rather than incremented, so the
    /// same update applied twice yields the same value.
    pub fn fanout_progress(&self) -> u8 {
        if self.agents.is_empty() {
            return 10;
        }
        let resolved = self
            .agents
            .iter()
            .filter(|a| a.status.is_terminal())
            .count();
        10 + (60 * resolved / self.agents.len()) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_has_one_idle_agent_per_domain() {
        let job = Job::new("respiratory diseases in India");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.agents.len(), Domain::ALL.len());
        assert!(job.agents.iter().all(|a| a.status == AgentPhase::Idle));
    }

    #[test]
    fn status_transitions_are_monotonic() {
        let mut job = Job::new("q");
        assert!(job.set_status(JobStatus::Running));
        assert!(!job.set_status(JobStatus::Queued));
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.set_status(JobStatus::Completed));
        assert!(!job.set_status(JobStatus::Failed));
        assert!(!job.set_status(JobStatus::Running));
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = Job::new("q");
        job.set_progress(40);
        job.set_progress(10);
        assert_eq!(job.progress, 40);
        job.set_progress(200);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn agent_update_is_idempotent() {
        let mut job = Job::new("q");
        job.update_agent(Domain::Patents, AgentPhase::Completed, Some(6), None);
        let first = job.agent(Domain::Patents).unwrap().clone();
        job.update_agent(Domain::Patents, AgentPhase::Completed, Some(6), None);
        let second = job.agent(Domain::Patents).unwrap();
        assert_eq!(second.result_count, 6);
        assert_eq!(second.finished_at, first.finished_at);
    }

    #[test]
    fn job_serializes_its_id_as_job_id() {
        let job = Job::new("q");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["job_id"], job.id.to_string());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn terminal_job_rejects_further_mutation() {
        let mut job = Job::new("q");
        job.set_status(JobStatus::Running);
        job.set_progress(50);
        job.set_status(JobStatus::Failed);

        job.set_progress(95);
        job.update_agent(Domain::Patents, AgentPhase::Completed, Some(9), Some("late".into()));

        assert_eq!(job.progress, 50);
        let agent = job.agent(Domain::Patents).unwrap();
        assert_eq!(agent.status, AgentPhase::Idle);
        assert_eq!(agent.result_count, 0);
        assert!(agent.error.is_none());
    }

    #[test]
    fn fanout_progress_tracks_resolved_domains() {
        let mut job = Job::new("q");
        assert_eq!(job.fanout_progress(), 10);
        job.update_agent(Domain::ClinicalTrials, AgentPhase::Completed, Some(5), None);
        assert_eq!(job.fanout_progress(), 30);
        job.update_agent(Domain::Patents, AgentPhase::Failed, Some(0), None);
        assert_eq!(job.fanout_progress(), 50);
        job.update_agent(Domain::WebIntel, AgentPhase::Completed, Some(4), None);
        assert_eq!(job.fanout_progress(), 70);
    }
}
