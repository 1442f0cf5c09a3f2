//! Job orchestration: fan-out, synthesis, and terminal state handling.
//!
//! [`Orchestrator::run`] owns a job from `running` to its terminal state.
//! Provider and domain failures are absorbed inside the executor; anything
//! that escapes to this level is an internal fault and fails the job with a
//! recorded error.

pub mod confidence;
pub mod executor;
pub mod merge;
pub mod report;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::common::{AnalysisResult, Domain, ResultItem, ResultPayload};
use crate::domains::search::trials::ACTIVE_STATUSES;
use crate::kernel::ProgressBroadcaster;

pub use confidence::{ConfidenceLevel, DomainCounts, QualitativeScorer};
pub use executor::{DomainOutcome, ExecutorConfig, FanOutExecutor, Resolution};
pub use merge::{IdentityRanker, ResultRanker, ScoreRanker};
pub use report::ReportAssembler;

/// Items kept per domain in the presented result. Confidence and competition
/// are computed from the full merged lists before this cut.
const MAX_PRESENTED: usize = 15;

pub struct Orchestrator {
    broadcaster: Arc<ProgressBroadcaster>,
    executor: FanOutExecutor,
    qualitative: Option<Arc<dyn QualitativeScorer>>,
    reports: ReportAssembler,
}

impl Orchestrator {
    pub fn new(
        broadcaster: Arc<ProgressBroadcaster>,
        executor: FanOutExecutor,
        qualitative: Option<Arc<dyn QualitativeScorer>>,
        reports: ReportAssembler,
    ) -> Self {
        Self {
            broadcaster,
            executor,
            qualitative,
            reports,
        }
    }

    /// Drive the job to a terminal state. Never returns an error: internal
    /// faults are converted into a `failed` job record.
    pub async fn run(self: Arc<Self>, job_id: Uuid) {
        if let Err(e) = self.execute(job_id).await {
            tracing::error!(job_id = %job_id, error = %e, "job failed");
            if let Err(report_err) = self.broadcaster.job_failed(job_id, e.to_string()).await {
                tracing::error!(
                    job_id = %job_id,
                    error = %report_err,
                    "could not record job failure"
                );
            }
        }
    }

    async fn execute(&self, job_id: Uuid) -> anyhow::Result<()> {
        let job = self.broadcaster.store().get(job_id).await?;
        self.broadcaster.job_started(job_id, &job.query).await?;

        let outcomes = self.executor.run(job_id, &job.query, &self.broadcaster).await?;
        self.broadcaster.progress(job_id, 75).await?;

        let take = |domain: Domain| -> Vec<ResultItem> {
            outcomes
                .iter()
                .find(|o| o.domain == domain)
                .map(|o| o.items.clone())
                .unwrap_or_default()
        };
        let trials = take(Domain::ClinicalTrials);
        let patents = take(Domain::Patents);
        let web_intel = take(Domain::WebIntel);

        let counts = DomainCounts {
            trials: trials.len(),
            active_trials: count_active(&trials),
            patents: patents.len(),
            web_intel: web_intel.len(),
        };
        let competition = report::analyze_competition(&trials);
        self.broadcaster.progress(job_id, 85).await?;

        let now = Utc::now();
        let mut result = AnalysisResult {
            job_id,
            query: job.query.clone(),
            status: "completed".to_string(),
            executive_summary: report::executive_summary(&job.query, &competition),
            key_findings: Vec::new(),
            clinical_trials: truncate(trials),
            patents: truncate(patents),
            web_intel: truncate(web_intel),
            competition,
            confidence_score: 0.0,
            confidence_level: ConfidenceLevel::Low.as_str().to_string(),
            report_url: None,
            created_at: job.created_at,
            completed_at: now,
        };

        let (score, level) =
            confidence::score(&counts, Some(&result), self.qualitative.as_deref()).await;
        result.confidence_score = score;
        result.confidence_level = level.as_str().to_string();
        result.key_findings = report::key_findings(
            &result.competition,
            counts.patents,
            counts.web_intel,
            level.as_str(),
        );

        result.report_url = self.reports.write(&result).await;
        self.broadcaster.progress(job_id, 95).await?;

        result.completed_at = Utc::now();
        self.broadcaster.store().save_result(job_id, &result).await?;
        self.broadcaster
            .job_completed(
                job_id,
                json!({
                    "confidence_score": result.confidence_score,
                    "confidence_level": result.confidence_level,
                    "report_url": result.report_url,
                    "counts": {
                        "clinical_trials": counts.trials,
                        "patents": counts.patents,
                        "web_intel": counts.web_intel,
                    },
                }),
            )
            .await?;
        Ok(())
    }
}

fn count_active(trials: &[ResultItem]) -> usize {
    trials
        .iter()
        .filter(|item| match &item.payload {
            ResultPayload::Trial(t) => ACTIVE_STATUSES.contains(&t.status.as_str()),
            _ => false,
        })
        .count()
}

fn truncate(mut items: Vec<ResultItem>) -> Vec<ResultItem> {
    items.truncate(MAX_PRESENTED);
    items
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::common::{ProviderError, TrialRecord};
    use crate::domains::search::{DomainEntry, DomainRegistry, SearchLimits, SearchProvider};
    use crate::kernel::jobs::{JobStatus, JobStore, LocalJobStore};
    use crate::kernel::StreamHub;

    struct FixedProvider {
        name: &'static str,
        items: Vec<ResultItem>,
    }

    #[async_trait]
    impl SearchProvider for FixedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(
            &self,
            _query: &str,
            _limits: &SearchLimits,
        ) -> Result<Vec<ResultItem>, ProviderError> {
            Ok(self.items.clone())
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl SearchProvider for BrokenProvider {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn search(
            &self,
            _query: &str,
            _limits: &SearchLimits,
        ) -> Result<Vec<ResultItem>, ProviderError> {
            Err(ProviderError::InvalidResponse("garbled".into()))
        }
    }

    fn trial(id: &str, status: &str) -> ResultItem {
        ResultItem {
            canonical_id: id.to_string(),
            title: format!("Trial {id}"),
            source: "stub".to_string(),
            score: None,
            payload: ResultPayload::Trial(TrialRecord {
                status: status.to_string(),
                source_url: format!("https://clinicaltrials.gov/study/{id}"),
                ..Default::default()
            }),
        }
    }

    fn entry(
        domain: Domain,
        provider: Arc<dyn SearchProvider>,
        fallback: Arc<dyn SearchProvider>,
    ) -> DomainEntry {
        DomainEntry {
            domain,
            providers: vec![provider],
            fallback,
        }
    }

    fn orchestrator_with(
        registry: DomainRegistry,
    ) -> (Arc<dyn JobStore>, Arc<Orchestrator>) {
        let store: Arc<dyn JobStore> = Arc::new(LocalJobStore::ephemeral());
        let broadcaster = Arc::new(ProgressBroadcaster::new(store.clone(), StreamHub::new()));
        let executor = FanOutExecutor::new(
            Arc::new(registry),
            ExecutorConfig::default(),
            merge::default_ranker(),
        );
        let reports = ReportAssembler::new(
            std::env::temp_dir().join(format!("orch-test-{}", Uuid::new_v4())),
        );
        (
            store,
            Arc::new(Orchestrator::new(broadcaster, executor, None, reports)),
        )
    }

    fn happy_registry() -> DomainRegistry {
        let noop_fallback: Arc<dyn SearchProvider> = Arc::new(FixedProvider {
            name: "fallback",
            items: vec![],
        });
        DomainRegistry::new(vec![
            entry(
                Domain::ClinicalTrials,
                Arc::new(FixedProvider {
                    name: "trials",
                    items: vec![trial("NCT1", "RECRUITING"), trial("NCT2", "COMPLETED")],
                }),
                noop_fallback.clone(),
            ),
            entry(
                Domain::Patents,
                Arc::new(FixedProvider {
                    name: "patents",
                    items: vec![],
                }),
                noop_fallback.clone(),
            ),
            entry(
                Domain::WebIntel,
                Arc::new(FixedProvider {
                    name: "pmc",
                    items: vec![],
                }),
                noop_fallback,
            ),
        ])
    }

    #[tokio::test]
    async fn happy_path_completes_job_with_result() {
        let (store, orchestrator) = orchestrator_with(happy_registry());
        let job = store.create("asthma landscape").await.unwrap();

        orchestrator.run(job.id).await;

        let finished = store.get(job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress, 100);

        let result = store.result(job.id).await.unwrap().unwrap();
        assert_eq!(result.clinical_trials.len(), 2);
        assert_eq!(result.competition.active_trials, 1);
        assert!(!result.key_findings.is_empty());
        assert!(result.key_findings[0].contains(&result.confidence_level));
    }

    #[tokio::test]
    async fn fallback_failure_fails_the_job_with_recorded_error() {
        let registry = DomainRegistry::new(vec![entry(
            Domain::ClinicalTrials,
            Arc::new(BrokenProvider),
            Arc::new(BrokenProvider),
        )]);
        let (store, orchestrator) = orchestrator_with(registry);
        let job = store.create("q").await.unwrap();

        orchestrator.run(job.id).await;

        let finished = store.get(job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
        assert!(finished.error.is_some());
        assert!(store.result(job.id).await.unwrap().is_none());
    }
}
