//! Patent adapters: FreePatentsOnline (HTML search page) and EPO Open
//! Patent Services (XML search).
//!
//! Neither source needs an API key, which keeps the domain redundant without
//! credentials. Both normalize into `PatentRecord` items keyed by the patent
//! publication number.

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};

use super::{keyword_terms, SearchLimits, SearchProvider};
use crate::common::error::status_to_provider_error;
use crate::common::{PatentRecord, ProviderError, ResultItem, ResultPayload};

const FPO_URL: &str = "https://www.freepatentsonline.com/result.html";
const EPO_URL: &str = "https://ops.epo.org/3.2/rest-services/published-data/search";

lazy_static! {
    static ref US_PATENT_RE: Regex = Regex::new(r"US(\d{7,10}[A-Z]\d)").unwrap();
    static ref EPO_DOC_RE: Regex = Regex::new(r"<doc-number>(\d+)</doc-number>").unwrap();
    static ref EPO_TITLE_RE: Regex = Regex::new(r"<invention-title[^>]*>([^<]+)</invention-title>").unwrap();
    static ref ANCHOR_SELECTOR: Selector = Selector::parse("a[href]").unwrap();
}

pub struct FreePatentsOnline {
    http: reqwest::Client,
}

impl FreePatentsOnline {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Walk the result page: collect US publication numbers, preferring the
    /// anchor text around each match as the title when one exists.
    fn parse_results(html: &str, max_results: usize) -> Vec<ResultItem> {
        let document = Html::parse_document(html);

        let mut titles: Vec<(String, String)> = Vec::new();
        for link in document.select(&ANCHOR_SELECTOR) {
            let href = link.value().attr("href").unwrap_or_default();
            if let Some(caps) = US_PATENT_RE.captures(href) {
                let text = link.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    titles.push((format!("US{}", &caps[1]), text));
                }
            }
        }

        let mut items = Vec::new();
        let mut seen = Vec::new();
        for caps in US_PATENT_RE.captures_iter(html) {
            let patent_id = format!("US{}", &caps[1]);
            if seen.contains(&patent_id) {
                continue;
            }
            seen.push(patent_id.clone());

            let title = titles
                .iter()
                .find(|(id, _)| *id == patent_id)
                .map(|(_, t)| t.clone())
                .unwrap_or_else(|| format!("US patent {patent_id}"));

            items.push(ResultItem {
                canonical_id: patent_id.clone(),
                title,
                source: "freepatentsonline".to_string(),
                score: Some(0.7),
                payload: ResultPayload::Patent(PatentRecord {
                    assignee: None,
                    filing_date: None,
                    status: Some("Granted".to_string()),
                    summary: None,
                    source_url: format!("https://www.freepatentsonline.com/{patent_id}.html"),
                    retrieved_at: Some(Utc::now()),
                }),
            });
            if items.len() >= max_results {
                break;
            }
        }
        items
    }
}

#[async_trait]
impl SearchProvider for FreePatentsOnline {
    fn name(&self) -> &'static str {
        "freepatentsonline"
    }

    async fn search(
        &self,
        query: &str,
        limits: &SearchLimits,
    ) -> Result<Vec<ResultItem>, ProviderError> {
        let terms = keyword_terms(query);
        let q = if terms.is_empty() {
            query.to_string()
        } else {
            terms[..terms.len().min(3)].join(" ")
        };

        let response = self
            .http
            .get(FPO_URL)
            .query(&[("p", "1"), ("q", q.as_str()), ("srch", "top")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_to_provider_error(response.status()));
        }
        let body = response.text().await?;

        let items = Self::parse_results(&body, limits.max_results);
        tracing::debug!(provider = self.name(), count = items.len(), "patents fetched");
        Ok(items)
    }
}

pub struct EpoOps {
    http: reqwest::Client,
}

impl EpoOps {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn parse_results(xml: &str, max_results: usize) -> Vec<ResultItem> {
        let titles: Vec<String> = EPO_TITLE_RE
            .captures_iter(xml)
            .map(|c| c[1].trim().to_string())
            .collect();

        let mut items = Vec::new();
        let mut seen = Vec::new();
        for (i, caps) in EPO_DOC_RE.captures_iter(xml).enumerate() {
            let doc_number = caps[1].to_string();
            if seen.contains(&doc_number) {
                continue;
            }
            seen.push(doc_number.clone());

            items.push(ResultItem {
                canonical_id: format!("EP{doc_number}"),
                title: titles
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("EP patent {doc_number}")),
                source: "epo_ops".to_string(),
                score: Some(0.8),
                payload: ResultPayload::Patent(PatentRecord {
                    assignee: None,
                    filing_date: None,
                    status: Some("Published".to_string()),
                    summary: None,
                    source_url: format!(
                        "https://worldwide.espacenet.com/patent/search?q={doc_number}"
                    ),
                    retrieved_at: Some(Utc::now()),
                }),
            });
            if items.len() >= max_results {
                break;
            }
        }
        items
    }
}

#[async_trait]
impl SearchProvider for EpoOps {
    fn name(&self) -> &'static str {
        "epo_ops"
    }

    async fn search(
        &self,
        query: &str,
        limits: &SearchLimits,
    ) -> Result<Vec<ResultItem>, ProviderError> {
        let terms = keyword_terms(query);
        let q = if terms.is_empty() {
            query.to_string()
        } else {
            terms.join(" OR ")
        };

        let response = self
            .http
            .get(EPO_URL)
            .query(&[
                ("q", q.as_str()),
                ("Range", &format!("1-{}", limits.max_results)),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_to_provider_error(response.status()));
        }
        let body = response.text().await?;

        let items = Self::parse_results(&body, limits.max_results);
        tracing::debug!(provider = self.name(), count = items.len(), "patents fetched");
        Ok(items)
    }
}
