//! Confidence scoring for a synthesized result.
//!
//! The base score is a weighted count of merged evidence, clamped to 0..=100.
//! More evidence never lowers the score. An optional qualitative scorer can
//! blend in a second opinion; if it fails the base score stands alone, the
//! job never degrades because of it.

use async_trait::async_trait;

use crate::common::{AnalysisResult, Domain};

const TRIAL_WEIGHT: f64 = 4.0;
const ACTIVE_TRIAL_BONUS: f64 = 1.0;
const PATENT_WEIGHT: f64 = 3.0;
const LITERATURE_WEIGHT: f64 = 3.0;

const HIGH_THRESHOLD: f64 = 75.0;
const MEDIUM_THRESHOLD: f64 = 45.0;

/// Evidence counts per domain, taken from the full merged lists (before any
/// presentation truncation).
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainCounts {
    pub trials: usize,
    pub active_trials: usize,
    pub patents: usize,
    pub web_intel: usize,
}

impl DomainCounts {
    pub fn count_for(&self, domain: Domain) -> usize {
        match domain {
            Domain::ClinicalTrials => self.trials,
            Domain::Patents => self.patents,
            Domain::WebIntel => self.web_intel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

/// Weighted evidence score, monotone in every count.
pub fn base_score(counts: &DomainCounts) -> f64 {
    let raw = counts.trials as f64 * TRIAL_WEIGHT
        + counts.active_trials as f64 * ACTIVE_TRIAL_BONUS
        + counts.patents as f64 * PATENT_WEIGHT
        + counts.web_intel as f64 * LITERATURE_WEIGHT;
    raw.clamp(0.0, 100.0)
}

/// Optional second opinion on result quality, 0..=100.
#[async_trait]
pub trait QualitativeScorer: Send + Sync {
    async fn assess(&self, result: &AnalysisResult) -> anyhow::Result<f64>;
}

/// Final score: quantitative base, optionally blended half-and-half with a
/// qualitative assessment. Scorer errors are logged and ignored.
pub async fn score(
    counts: &DomainCounts,
    result: Option<&AnalysisResult>,
    qualitative: Option<&dyn QualitativeScorer>,
) -> (f64, ConfidenceLevel) {
    let base = base_score(counts);
    let blended = match (result, qualitative) {
        (Some(result), Some(scorer)) => match scorer.assess(result).await {
            Ok(opinion) => (base * 0.5 + opinion.clamp(0.0, 100.0) * 0.5).clamp(0.0, 100.0),
            Err(e) => {
                tracing::warn!(error = %e, "qualitative scorer failed, keeping base score");
                base
            }
        },
        _ => base,
    };
    let rounded = (blended * 10.0).round() / 10.0;
    (rounded, ConfidenceLevel::from_score(rounded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_score_weighs_each_domain() {
        let counts = DomainCounts {
            trials: 6,
            active_trials: 0,
            patents: 6,
            web_intel: 4,
        };
        // 6*4 + 6*3 + 4*3 = 54
        assert_eq!(base_score(&counts), 54.0);
        assert_eq!(ConfidenceLevel::from_score(54.0), ConfidenceLevel::Medium);
    }

    #[test]
    fn base_score_clamps_at_100() {
        let counts = DomainCounts {
            trials: 20,
            active_trials: 20,
            patents: 20,
            web_intel: 20,
        };
        assert_eq!(base_score(&counts), 100.0);
    }

    #[test]
    fn more_evidence_never_lowers_the_score() {
        let small = DomainCounts {
            trials: 3,
            active_trials: 1,
            patents: 2,
            web_intel: 2,
        };
        let mut bigger = small;
        bigger.trials += 1;
        bigger.active_trials += 1;
        assert!(base_score(&bigger) >= base_score(&small));
    }

    #[test]
    fn level_thresholds_are_inclusive() {
        assert_eq!(ConfidenceLevel::from_score(75.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(74.9), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(45.0), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(44.9), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.0), ConfidenceLevel::Low);
    }

    struct FixedScorer(anyhow::Result<f64>);

    #[async_trait]
    impl QualitativeScorer for FixedScorer {
        async fn assess(&self, _result: &AnalysisResult) -> anyhow::Result<f64> {
            match &self.0 {
                Ok(v) => Ok(*v),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            job_id: uuid::Uuid::new_v4(),
            query: "asthma".to_string(),
            status: "completed".to_string(),
            executive_summary: String::new(),
            key_findings: vec![],
            clinical_trials: vec![],
            patents: vec![],
            web_intel: vec![],
            competition: crate::common::CompetitionAnalysis {
                level: "low".to_string(),
                active_trials: 0,
                total_trials: 0,
                phase_distribution: Default::default(),
            },
            confidence_score: 0.0,
            confidence_level: "Low".to_string(),
            report_url: None,
            created_at: chrono::Utc::now(),
            completed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn qualitative_opinion_blends_half_and_half() {
        let counts = DomainCounts {
            trials: 10,
            active_trials: 0,
            patents: 0,
            web_intel: 0,
        };
        let result = sample_result();
        let scorer = FixedScorer(Ok(80.0));
        let (final_score, level) = score(&counts, Some(&result), Some(&scorer)).await;
        // (40 + 80) / 2 = 60
        assert_eq!(final_score, 60.0);
        assert_eq!(level, ConfidenceLevel::Medium);
    }

    #[tokio::test]
    async fn scorer_failure_falls_back_to_base() {
        let counts = DomainCounts {
            trials: 10,
            active_trials: 0,
            patents: 0,
            web_intel: 0,
        };
        let result = sample_result();
        let scorer = FixedScorer(Err(anyhow::anyhow!("model unavailable")));
        let (final_score, _) = score(&counts, Some(&result), Some(&scorer)).await;
        assert_eq!(final_score, 40.0);
    }

    #[tokio::test]
    async fn no_scorer_uses_base_directly() {
        let counts = DomainCounts {
            trials: 6,
            active_trials: 2,
            patents: 6,
            web_intel: 4,
        };
        let (final_score, _) = score(&counts, None, None).await;
        assert_eq!(final_score, base_score(&counts));
    }
}
