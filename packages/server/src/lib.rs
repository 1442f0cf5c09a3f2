//! Pharmaceutical intelligence aggregation service.
//!
//! Layering: `common` holds shared types and the error taxonomy, `kernel`
//! the job store and progress plumbing, `domains` the search adapters and
//! the orchestration pipeline, `server` the HTTP surface.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
