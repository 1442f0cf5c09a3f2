//! Kernel-level infrastructure: job store, progress broadcasting, streaming.
//!
//! Business logic (providers, orchestration) lives in `domains`; this module
//! only provides the plumbing they run on.

pub mod broadcaster;
pub mod jobs;
pub mod stream_hub;

pub use broadcaster::{ProgressBroadcaster, ProgressEventType};
pub use stream_hub::StreamHub;
