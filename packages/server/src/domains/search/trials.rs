//! ClinicalTrials.gov adapter (api/v2/studies).

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use super::{SearchLimits, SearchProvider};
use crate::common::error::status_to_provider_error;
use crate::common::{ProviderError, ResultItem, ResultPayload, TrialRecord};

const BASE_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// Trial statuses counted as active competition.
pub const ACTIVE_STATUSES: &[&str] = &[
    "RECRUITING",
    "ACTIVE_NOT_RECRUITING",
    "ENROLLING_BY_INVITATION",
];

pub struct ClinicalTrialsGov {
    http: reqwest::Client,
}

impl ClinicalTrialsGov {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Pick a condition term and optional location filter from the query.
    fn extract_keywords(query: &str) -> (String, Option<String>) {
        const DISEASES: &[&str] = &[
            "respiratory",
            "cardiovascular",
            "diabetes",
            "cancer",
            "asthma",
            "copd",
            "pneumonia",
            "tuberculosis",
            "covid",
            "influenza",
        ];
        const LOCATIONS: &[&str] = &["india", "united states", "china", "europe", "asia", "africa"];

        let lower = query.to_lowercase();
        let condition = DISEASES
            .iter()
            .find(|d| lower.contains(**d))
            .map(|d| d.to_string())
            .unwrap_or_else(|| query.to_string());
        let location = LOCATIONS
            .iter()
            .find(|l| lower.contains(**l))
            .map(|l| l.to_string());
        (condition, location)
    }
}

#[async_trait]
impl SearchProvider for ClinicalTrialsGov {
    fn name(&self) -> &'static str {
        "clinicaltrials_gov"
    }

    async fn search(
        &self,
        query: &str,
        limits: &SearchLimits,
    ) -> Result<Vec<ResultItem>, ProviderError> {
        let (condition, location) = Self::extract_keywords(query);

        let mut params = vec![
            ("query.cond".to_string(), condition),
            ("pageSize".to_string(), limits.max_results.to_string()),
            ("countTotal".to_string(), "true".to_string()),
            ("format".to_string(), "json".to_string()),
        ];
        if let Some(location) = location {
            params.push(("query.locn".to_string(), location));
        }

        let response = self.http.get(BASE_URL).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(status_to_provider_error(response.status()));
        }

        let body: StudiesResponse = response.json().await?;
        let items = body
            .studies
            .into_iter()
            .filter_map(|study| study.into_item(self.name()))
            .collect::<Vec<_>>();
        tracing::debug!(provider = self.name(), count = items.len(), "trials fetched");
        Ok(items)
    }
}

#[derive(Deserialize)]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

#[derive(Deserialize)]
struct Study {
    #[serde(rename = "protocolSection", default)]
    protocol: Protocol,
}

#[derive(Deserialize, Default)]
struct Protocol {
    #[serde(rename = "identificationModule", default)]
    identification: Identification,
    #[serde(rename = "statusModule", default)]
    status: StatusModule,
    #[serde(rename = "designModule", default)]
    design: DesignModule,
    #[serde(rename = "conditionsModule", default)]
    conditions: ConditionsModule,
    #[serde(rename = "armsInterventionsModule", default)]
    interventions: InterventionsModule,
    #[serde(rename = "sponsorCollaboratorsModule", default)]
    sponsor: SponsorModule,
    #[serde(rename = "contactsLocationsModule", default)]
    contacts: ContactsModule,
}

#[derive(Deserialize, Default)]
struct Identification {
    #[serde(rename = "nctId")]
    nct_id: Option<String>,
    #[serde(rename = "briefTitle")]
    brief_title: Option<String>,
}

#[derive(Deserialize, Default)]
struct StatusModule {
    #[serde(rename = "overallStatus")]
    overall_status: Option<String>,
    #[serde(rename = "startDateStruct", default)]
    start: DateStruct,
    #[serde(rename = "completionDateStruct", default)]
    completion: DateStruct,
}

#[derive(Deserialize, Default)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Deserialize, Default)]
struct DesignModule {
    #[serde(default)]
    phases: Vec<String>,
    #[serde(rename = "enrollmentInfo", default)]
    enrollment: EnrollmentInfo,
}

#[derive(Deserialize, Default)]
struct EnrollmentInfo {
    count: Option<i64>,
}

#[derive(Deserialize, Default)]
struct ConditionsModule {
    #[serde(default)]
    conditions: Vec<String>,
}

#[derive(Deserialize, Default)]
struct InterventionsModule {
    #[serde(default)]
    interventions: Vec<Intervention>,
}

#[derive(Deserialize)]
struct Intervention {
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct SponsorModule {
    #[serde(rename = "leadSponsor", default)]
    lead_sponsor: LeadSponsor,
}

#[derive(Deserialize, Default)]
struct LeadSponsor {
    name: Option<String>,
}

#[derive(Deserialize, Default)]
struct ContactsModule {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Deserialize)]
struct Location {
    country: Option<String>,
}

impl Study {
    /// Studies without an NCT id carry no usable canonical id and are dropped.
    fn into_item(self, source: &str) -> Option<ResultItem> {
        let protocol = self.protocol;
        let nct_id = protocol.identification.nct_id?;
        let title = protocol
            .identification
            .brief_title
            .unwrap_or_else(|| "Untitled Study".to_string());
        let condition = if protocol.conditions.conditions.is_empty() {
            None
        } else {
            Some(protocol.conditions.conditions.join(", "))
        };

        Some(ResultItem {
            canonical_id: nct_id.clone(),
            title,
            source: source.to_string(),
            score: None,
            payload: ResultPayload::Trial(TrialRecord {
                status: protocol
                    .status
                    .overall_status
                    .unwrap_or_else(|| "Unknown".to_string()),
                phase: protocol.design.phases.into_iter().next(),
                condition,
                intervention: protocol
                    .interventions
                    .interventions
                    .into_iter()
                    .next()
                    .and_then(|i| i.name),
                sponsor: protocol.sponsor.lead_sponsor.name,
                enrollment: protocol.design.enrollment.count,
                location: protocol
                    .contacts
                    .locations
                    .into_iter()
                    .next()
                    .and_then(|l| l.country),
                start_date: protocol.status.start.date,
                completion_date: protocol.status.completion.date,
                source_url: format!("https://clinicaltrials.gov/study/{nct_id}"),
                retrieved_at: Some(Utc::now()),
            }),
        })
    }
}
