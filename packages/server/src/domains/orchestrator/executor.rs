//! Two-level fan-out: domains in parallel, providers in parallel inside each
//! domain.
//!
//! Failure containment is strictly layered. A provider attempt may time out
//! or error; one retry is allowed for transient faults. A domain whose
//! network providers all fail is rescued by its curated fallback. Only a
//! fallback failure escapes this function, and that is an internal fault,
//! not a data-source outage.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::merge::{merge_provider_results, ProviderResults, ResultRanker};
use crate::common::{Domain, ProviderError, ResultItem};
use crate::domains::search::{DomainEntry, DomainRegistry, SearchLimits, SearchProvider};
use crate::kernel::ProgressBroadcaster;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deadline for a single provider attempt.
    pub provider_timeout: Duration,
    /// Deadline for the whole fan-out; hitting it forces partial resolution.
    pub job_timeout: Duration,
    pub limits: SearchLimits,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(10),
            job_timeout: Duration::from_secs(120),
            limits: SearchLimits::default(),
        }
    }
}

/// How a domain reached its final item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Every network provider succeeded.
    Full,
    /// At least one provider failed, the rest supplied the data.
    Partial,
    /// The job deadline cut the fan-out short.
    ForcedTimeout,
}

pub struct DomainOutcome {
    pub domain: Domain,
    pub items: Vec<ResultItem>,
    /// One entry per failed provider attempt chain, for the status note.
    pub provider_errors: Vec<String>,
    pub resolution: Resolution,
    pub used_fallback: bool,
}

struct ProviderOutcome {
    provider: &'static str,
    priority: usize,
    result: Result<Vec<ResultItem>, ProviderError>,
}

pub struct FanOutExecutor {
    registry: Arc<DomainRegistry>,
    config: ExecutorConfig,
    ranker: Arc<dyn ResultRanker>,
}

impl FanOutExecutor {
    pub fn new(
        registry: Arc<DomainRegistry>,
        config: ExecutorConfig,
        ranker: Arc<dyn ResultRanker>,
    ) -> Self {
        Self {
            registry,
            config,
            ranker,
        }
    }

    /// Fan out `query` across every registered domain, one task per domain.
    ///
    /// Each domain joins its own provider tasks and resolves as soon as they
    /// finish, so a fast domain's `agent_update` lands while slower domains
    /// are still searching. A single deadline token spans all domains; when
    /// it fires, every still-pending domain force-resolves with whatever its
    /// providers delivered.
    pub async fn run(
        &self,
        job_id: Uuid,
        query: &str,
        broadcaster: &ProgressBroadcaster,
    ) -> anyhow::Result<Vec<DomainOutcome>> {
        let deadline = CancellationToken::new();
        let timer = tokio::spawn({
            let deadline = deadline.clone();
            let job_timeout = self.config.job_timeout;
            async move {
                tokio::time::sleep(job_timeout).await;
                tracing::warn!(job_id = %job_id, "job deadline hit, forcing partial resolution");
                deadline.cancel();
            }
        });

        let results = join_all(self.registry.entries().iter().map(|entry| {
            let deadline = deadline.clone();
            async move { self.run_domain(job_id, query, entry, deadline, broadcaster).await }
        }))
        .await;
        timer.abort();

        let mut outcomes = Vec::with_capacity(results.len());
        for result in results {
            outcomes.push(result?);
        }
        Ok(outcomes)
    }

    /// Run one domain's providers in parallel and resolve the domain the
    /// moment they all finish (or the job deadline cuts them short).
    async fn run_domain(
        &self,
        job_id: Uuid,
        query: &str,
        entry: &DomainEntry,
        deadline: CancellationToken,
        broadcaster: &ProgressBroadcaster,
    ) -> anyhow::Result<DomainOutcome> {
        broadcaster.agent_running(job_id, entry.domain).await?;

        // Provider tasks push outcomes as they finish. A task cancelled
        // before finishing simply leaves no entry.
        let collector: Arc<Mutex<Vec<ProviderOutcome>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(entry.providers.len());
        for (priority, provider) in entry.providers.iter().enumerate() {
            let provider = provider.clone();
            let collector = collector.clone();
            let query = query.to_string();
            let limits = self.config.limits.clone();
            let provider_timeout = self.config.provider_timeout;
            let token = deadline.child_token();

            handles.push(tokio::spawn(async move {
                let name = provider.name();
                let result =
                    search_with_retry(&*provider, &query, &limits, provider_timeout, &token).await;
                if let Err(e) = &result {
                    tracing::warn!(provider = name, error = %e, "provider attempt failed");
                }
                if let Ok(mut outcomes) = collector.lock() {
                    outcomes.push(ProviderOutcome {
                        provider: name,
                        priority,
                        result,
                    });
                }
            }));
        }

        let forced = tokio::select! {
            _ = join_all(handles) => false,
            _ = deadline.cancelled() => {
                // Short grace so cancelled attempts can record their timeout.
                tokio::time::sleep(Duration::from_millis(50)).await;
                true
            }
        };

        let finished = match collector.lock() {
            Ok(mut outcomes) => std::mem::take(&mut *outcomes),
            Err(_) => Vec::new(),
        };
        self.resolve_domain(job_id, query, entry, finished, forced, broadcaster)
            .await
    }

    /// Merge a domain's provider outcomes, rescuing via fallback when every
    /// network provider failed.
    async fn resolve_domain(
        &self,
        job_id: Uuid,
        query: &str,
        entry: &DomainEntry,
        finished: Vec<ProviderOutcome>,
        forced: bool,
        broadcaster: &ProgressBroadcaster,
    ) -> anyhow::Result<DomainOutcome> {
        let domain = entry.domain;

        let mut provider_errors = Vec::new();
        let mut successes = Vec::new();
        for outcome in finished {
            match outcome.result {
                Ok(mut items) => {
                    // `source` always names the provider that delivered the
                    // copy, whatever the adapter put there.
                    for item in &mut items {
                        item.source = outcome.provider.to_string();
                    }
                    successes.push(ProviderResults {
                        provider: outcome.provider,
                        priority: outcome.priority,
                        items,
                    });
                }
                Err(e) => provider_errors.push(format!("{}: {e}", outcome.provider)),
            }
        }
        // Providers cut off before recording anything count as timed out.
        let unfinished = entry.providers.len() - successes.len() - provider_errors.len();
        for _ in 0..unfinished {
            provider_errors.push(format!(
                "unfinished provider: {}",
                ProviderError::Timeout(self.config.job_timeout)
            ));
        }

        let mut used_fallback = false;
        if successes.is_empty() {
            // Rescue stage. The curated fallback does no I/O; a failure here
            // is an internal fault and fails the job.
            let items = match entry.fallback.search(query, &self.config.limits).await {
                Ok(mut items) => {
                    for item in &mut items {
                        item.source = entry.fallback.name().to_string();
                    }
                    items
                }
                Err(e) => {
                    broadcaster
                        .agent_failed(job_id, domain, format!("fallback failed: {e}"))
                        .await?;
                    return Err(anyhow::anyhow!("fallback provider for {domain} failed: {e}"));
                }
            };
            tracing::info!(
                job_id = %job_id,
                domain = %domain,
                count = items.len(),
                "all network providers failed, using curated fallback"
            );
            used_fallback = true;
            successes.push(ProviderResults {
                provider: entry.fallback.name(),
                priority: 0,
                items,
            });
        }

        let resolution = if forced {
            Resolution::ForcedTimeout
        } else if provider_errors.is_empty() {
            Resolution::Full
        } else {
            Resolution::Partial
        };

        let items = self.ranker.rank(merge_provider_results(successes));
        let note = if used_fallback {
            Some(format!(
                "curated fallback after provider failures: {}",
                provider_errors.join("; ")
            ))
        } else if provider_errors.is_empty() {
            None
        } else {
            Some(format!("degraded: {}", provider_errors.join("; ")))
        };
        broadcaster
            .agent_completed(job_id, domain, items.len(), note)
            .await?;

        Ok(DomainOutcome {
            domain,
            items,
            provider_errors,
            resolution,
            used_fallback,
        })
    }
}

/// One attempt plus a single retry for transient failures (timeout, network).
/// Rejections and malformed responses are not retried.
async fn search_with_retry(
    provider: &dyn SearchProvider,
    query: &str,
    limits: &SearchLimits,
    provider_timeout: Duration,
    token: &CancellationToken,
) -> Result<Vec<ResultItem>, ProviderError> {
    match attempt(provider, query, limits, provider_timeout, token).await {
        Err(e) if e.is_transient() && !token.is_cancelled() => {
            tracing::debug!(provider = provider.name(), error = %e, "retrying transient failure");
            attempt(provider, query, limits, provider_timeout, token).await
        }
        result => result,
    }
}

async fn attempt(
    provider: &dyn SearchProvider,
    query: &str,
    limits: &SearchLimits,
    provider_timeout: Duration,
    token: &CancellationToken,
) -> Result<Vec<ResultItem>, ProviderError> {
    tokio::select! {
        _ = token.cancelled() => Err(ProviderError::Timeout(provider_timeout)),
        result = tokio::time::timeout(provider_timeout, provider.search(query, limits)) => {
            result.unwrap_or(Err(ProviderError::Timeout(provider_timeout)))
        }
    }
}
