//! Job infrastructure: the durable per-job record and its store.
//!
//! All mutations for one job id are serialized (one writer at a time);
//! different jobs share no locks. The store is the authoritative state for
//! polling; push observers see a lossy mirror via the stream hub.

mod job;
mod store;

pub use job::{AgentPhase, AgentState, Job, JobStatus};
pub use store::{JobMutation, JobStore, JobStoreError, LocalJobStore};
