//! Europe PMC adapter: scientific literature with citation-derived relevance.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{SearchLimits, SearchProvider};
use crate::common::error::status_to_provider_error;
use crate::common::{ProviderError, PublicationRecord, ResultItem, ResultPayload};

const BASE_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";

pub struct EuropePmc {
    http: reqwest::Client,
}

impl EuropePmc {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Broaden common condition terms into OR-expanded search expressions.
    fn expand_query(query: &str) -> String {
        const EXPANSIONS: &[(&str, &str)] = &[
            ("respiratory", "respiratory disease OR pulmonary OR lung"),
            ("cardiovascular", "cardiovascular OR cardiac OR heart disease"),
            ("diabetes", "diabetes OR diabetic OR glycemic"),
            ("cancer", "cancer OR oncology OR tumor OR neoplasm"),
            ("asthma", "asthma OR bronchial"),
            ("copd", "COPD OR chronic obstructive pulmonary"),
            ("hypertension", "hypertension OR high blood pressure"),
            ("alzheimer", "Alzheimer OR dementia OR cognitive decline"),
        ];
        let lower = query.to_lowercase();
        for (key, expansion) in EXPANSIONS {
            if lower.contains(key) {
                return expansion.to_string();
            }
        }
        let terms = super::keyword_terms(query);
        if terms.is_empty() {
            "pharmaceutical research".to_string()
        } else {
            terms[..terms.len().min(5)].join(" ")
        }
    }
}

#[async_trait]
impl SearchProvider for EuropePmc {
    fn name(&self) -> &'static str {
        "europe_pmc"
    }

    async fn search(
        &self,
        query: &str,
        limits: &SearchLimits,
    ) -> Result<Vec<ResultItem>, ProviderError> {
        let response = self
            .http
            .get(BASE_URL)
            .query(&[
                ("query", Self::expand_query(query).as_str()),
                ("format", "json"),
                ("pageSize", &limits.max_results.to_string()),
                ("sort", "CITED desc"),
                ("resultType", "core"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_to_provider_error(response.status()));
        }

        let body: PmcResponse = response.json().await?;
        let items = body
            .result_list
            .result
            .into_iter()
            .filter_map(|p| p.into_item(self.name()))
            .collect::<Vec<_>>();
        tracing::debug!(provider = self.name(), count = items.len(), "publications fetched");
        Ok(items)
    }
}

#[derive(Deserialize)]
struct PmcResponse {
    #[serde(rename = "resultList", default)]
    result_list: PmcResultList,
}

#[derive(Deserialize, Default)]
struct PmcResultList {
    #[serde(default)]
    result: Vec<Publication>,
}

#[derive(Deserialize)]
struct Publication {
    pmid: Option<String>,
    pmcid: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstractText")]
    abstract_text: Option<String>,
    #[serde(rename = "journalTitle")]
    journal_title: Option<String>,
    source: Option<String>,
    #[serde(rename = "citedByCount", default)]
    cited_by_count: i64,
}

impl Publication {
    fn into_item(self, provider: &str) -> Option<ResultItem> {
        // Prefer PMC, then PubMed, then DOI, both for identity and links.
        let (canonical_id, url) = if let Some(pmcid) = &self.pmcid {
            (
                pmcid.clone(),
                format!("https://europepmc.org/article/PMC/{pmcid}"),
            )
        } else if let Some(pmid) = &self.pmid {
            (
                format!("PMID:{pmid}"),
                format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            )
        } else if let Some(doi) = &self.doi {
            (doi.clone(), format!("https://doi.org/{doi}"))
        } else {
            return None;
        };

        let mut title = self
            .title
            .unwrap_or_else(|| "Untitled Publication".to_string());
        if title.len() > 150 {
            title.truncate(147);
            title.push_str("...");
        }

        let snippet = self.abstract_text.map(|mut text| {
            if text.len() > 300 {
                text.truncate(300);
                text.push_str("...");
            }
            text
        });

        // Citation count mapped onto 0.5..=1.0, saturating at 1000 citations.
        let relevance = (0.5 + self.cited_by_count as f64 / 2000.0).min(1.0);

        Some(ResultItem {
            canonical_id,
            title,
            source: provider.to_string(),
            score: Some((relevance * 100.0).round() / 100.0),
            payload: ResultPayload::Publication(PublicationRecord {
                journal: self.journal_title.or(self.source),
                snippet,
                cited_by: Some(self.cited_by_count),
                url,
                retrieved_at: Some(Utc::now()),
            }),
        })
    }
}
