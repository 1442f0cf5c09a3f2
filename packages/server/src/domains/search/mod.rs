//! Provider contract and domain registry.
//!
//! Each domain holds an ordered list of network-backed providers (position =
//! merge priority, index 0 highest) plus exactly one guaranteed-fallback
//! provider with no external dependency. The fallback is a rescue stage: it
//! is consulted only when every network provider in the domain failed, so a
//! domain's aggregated result is never empty due to connectivity alone.

pub mod curated;
pub mod literature;
pub mod patents;
pub mod trials;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::common::{Domain, ProviderError, ResultItem};

/// Per-search constraints handed to every provider.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub max_results: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { max_results: 20 }
    }
}

/// Uniform search contract implemented by every adapter.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        query: &str,
        limits: &SearchLimits,
    ) -> Result<Vec<ResultItem>, ProviderError>;
}

/// One domain's adapters: ordered network providers and the fallback slot.
///
/// Keeping the fallback in its own field makes "exactly one guaranteed
/// fallback per domain" structural rather than a runtime check.
pub struct DomainEntry {
    pub domain: Domain,
    pub providers: Vec<Arc<dyn SearchProvider>>,
    pub fallback: Arc<dyn SearchProvider>,
}

pub struct DomainRegistry {
    entries: Vec<DomainEntry>,
}

impl DomainRegistry {
    pub fn new(entries: Vec<DomainEntry>) -> Self {
        Self { entries }
    }

    /// Registry wired with the production adapters for all three domains.
    pub fn with_default_providers(http: reqwest::Client) -> Self {
        Self::new(vec![
            DomainEntry {
                domain: Domain::ClinicalTrials,
                providers: vec![Arc::new(trials::ClinicalTrialsGov::new(http.clone()))],
                fallback: Arc::new(curated::CuratedTrials::new()),
            },
            DomainEntry {
                domain: Domain::Patents,
                providers: vec![
                    Arc::new(patents::FreePatentsOnline::new(http.clone())),
                    Arc::new(patents::EpoOps::new(http.clone())),
                ],
                fallback: Arc::new(curated::CuratedPatents::new()),
            },
            DomainEntry {
                domain: Domain::WebIntel,
                providers: vec![Arc::new(literature::EuropePmc::new(http))],
                fallback: Arc::new(curated::CuratedLiterature::new()),
            },
        ])
    }

    pub fn entries(&self) -> &[DomainEntry] {
        &self.entries
    }

    pub fn entry(&self, domain: Domain) -> Option<&DomainEntry> {
        self.entries.iter().find(|e| e.domain == domain)
    }
}

/// Shared HTTP client for provider round-trips. Per-request deadlines are
/// enforced by the executor; this is a backstop.
pub fn default_http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("pharma-intel-aggregator/0.1")
        .build()
        .map_err(Into::into)
}

/// Pull search keywords out of a free-text query: lowercase, stopwords and
/// short words removed.
pub fn keyword_terms(query: &str) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "what", "which", "how", "are", "the", "for", "and", "with", "show", "tell", "about",
        "does", "can", "will", "has", "but", "that", "this", "from", "into",
    ];
    query
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_terms_filters_stopwords_and_short_words() {
        let terms = keyword_terms("What are the competitive trials for asthma in India?");
        assert_eq!(terms, vec!["competitive", "trials", "asthma", "india"]);
    }

    #[test]
    fn keyword_terms_on_noise_is_empty() {
        assert!(keyword_terms("how can the").is_empty());
    }

    #[test]
    fn default_registry_covers_every_domain() {
        let registry = DomainRegistry::with_default_providers(reqwest::Client::new());
        for domain in Domain::ALL {
            let entry = registry.entry(domain).expect("domain registered");
            assert!(!entry.providers.is_empty());
        }
    }
}
