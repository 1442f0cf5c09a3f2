pub mod error;
pub mod types;

pub use error::{ApiError, ProviderError};
pub use types::{
    AnalysisResult, CompetitionAnalysis, Domain, PatentRecord, PublicationRecord, ResultItem,
    ResultPayload, TrialRecord,
};
