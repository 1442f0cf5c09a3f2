pub mod orchestrator;
pub mod search;
