//! Shared result types for the aggregation pipeline.
//!
//! Every provider response is normalized into a [`ResultItem`] at the adapter
//! boundary, so the orchestration core never touches a provider's raw payload
//! shape. The domain-specific fields live in the tagged [`ResultPayload`]
//! envelope.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An intelligence domain searched by the fan-out executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    ClinicalTrials,
    Patents,
    WebIntel,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::ClinicalTrials, Domain::Patents, Domain::WebIntel];

    /// Stable key used in API payloads and result maps.
    pub fn key(&self) -> &'static str {
        match self {
            Domain::ClinicalTrials => "clinical_trials",
            Domain::Patents => "patents",
            Domain::WebIntel => "web_intel",
        }
    }

    /// Human-readable agent name shown in job status payloads.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Domain::ClinicalTrials => "Clinical Trials Agent",
            Domain::Patents => "Patent Agent",
            Domain::WebIntel => "Web Intel Agent",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One normalized search hit from a provider.
///
/// `canonical_id` is the dedup key: unique within a domain's merged list,
/// shared across providers that surface the same underlying record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub canonical_id: String,
    pub title: String,
    /// Name of the provider that produced this copy.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub payload: ResultPayload,
}

impl ResultItem {
    /// Union in fields from a lower-priority duplicate.
    ///
    /// Primary fields (title, source, ids) are kept from `self`; any optional
    /// field missing on `self` but present on `other` is filled in. Payloads
    /// of mismatched kinds are left untouched.
    pub fn absorb(&mut self, other: &ResultItem) {
        if self.score.is_none() {
            self.score = other.score;
        }
        match (&mut self.payload, &other.payload) {
            (ResultPayload::Trial(a), ResultPayload::Trial(b)) => a.absorb(b),
            (ResultPayload::Patent(a), ResultPayload::Patent(b)) => a.absorb(b),
            (ResultPayload::Publication(a), ResultPayload::Publication(b)) => a.absorb(b),
            _ => {}
        }
    }
}

/// Domain-specific payload, tagged so persisted results stay self-describing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    Trial(TrialRecord),
    Patent(PatentRecord),
    Publication(PublicationRecord),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialRecord {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl TrialRecord {
    fn absorb(&mut self, other: &TrialRecord) {
        fill(&mut self.phase, &other.phase);
        fill(&mut self.condition, &other.condition);
        fill(&mut self.intervention, &other.intervention);
        fill(&mut self.sponsor, &other.sponsor);
        fill(&mut self.enrollment, &other.enrollment);
        fill(&mut self.location, &other.location);
        fill(&mut self.start_date, &other.start_date);
        fill(&mut self.completion_date, &other.completion_date);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatentRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl PatentRecord {
    fn absorb(&mut self, other: &PatentRecord) {
        fill(&mut self.assignee, &other.assignee);
        fill(&mut self.filing_date, &other.filing_date);
        fill(&mut self.status, &other.status);
        fill(&mut self.summary, &other.summary);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cited_by: Option<i64>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl PublicationRecord {
    fn absorb(&mut self, other: &PublicationRecord) {
        fill(&mut self.journal, &other.journal);
        fill(&mut self.snippet, &other.snippet);
        fill(&mut self.cited_by, &other.cited_by);
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(other);
    }
}

/// Competitive landscape derived from the merged clinical trials list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionAnalysis {
    pub level: String,
    pub active_trials: usize,
    pub total_trials: usize,
    pub phase_distribution: std::collections::BTreeMap<String, usize>,
}

/// Final synthesized result for a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub job_id: Uuid,
    pub query: String,
    pub status: String,
    pub executive_summary: String,
    pub key_findings: Vec<String>,
    pub clinical_trials: Vec<ResultItem>,
    pub patents: Vec<ResultItem>,
    pub web_intel: Vec<ResultItem>,
    pub competition: CompetitionAnalysis,
    pub confidence_score: f64,
    pub confidence_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial_item(id: &str, source: &str, sponsor: Option<&str>) -> ResultItem {
        ResultItem {
            canonical_id: id.to_string(),
            title: format!("Trial {id}"),
            source: source.to_string(),
            score: None,
            payload: ResultPayload::Trial(TrialRecord {
                status: "RECRUITING".to_string(),
                sponsor: sponsor.map(str::to_string),
                source_url: format!("https://clinicaltrials.gov/study/{id}"),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn absorb_fills_missing_optional_fields_only() {
        let mut kept = trial_item("NCT1", "primary", None);
        let mut dup = trial_item("NCT1", "secondary", Some("Acme Pharma"));
        if let ResultPayload::Trial(t) = &mut dup.payload {
            t.phase = Some("Phase 2".to_string());
        }
        dup.score = Some(0.4);

        kept.absorb(&dup);

        assert_eq!(kept.source, "primary");
        assert_eq!(kept.score, Some(0.4));
        let ResultPayload::Trial(t) = &kept.payload else {
            panic!("payload kind changed");
        };
        assert_eq!(t.sponsor.as_deref(), Some("Acme Pharma"));
        assert_eq!(t.phase.as_deref(), Some("Phase 2"));
        assert_eq!(t.status, "RECRUITING");
    }

    #[test]
    fn absorb_keeps_existing_fields() {
        let mut kept = trial_item("NCT1", "primary", Some("Original Sponsor"));
        let dup = trial_item("NCT1", "secondary", Some("Other Sponsor"));
        kept.absorb(&dup);
        let ResultPayload::Trial(t) = &kept.payload else {
            panic!("payload kind changed");
        };
        assert_eq!(t.sponsor.as_deref(), Some("Original Sponsor"));
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let item = trial_item("NCT42", "clinicaltrials_gov", None);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "trial");
        assert_eq!(json["canonical_id"], "NCT42");
        let back: ResultItem = serde_json::from_value(json).unwrap();
        assert!(matches!(back.payload, ResultPayload::Trial(_)));
    }
}
