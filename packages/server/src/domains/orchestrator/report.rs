//! Result synthesis: competition analysis, narrative text, and the
//! downloadable report artifact.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::common::{AnalysisResult, CompetitionAnalysis, ResultItem, ResultPayload};
use crate::domains::search::trials::ACTIVE_STATUSES;

/// Derive the competitive landscape from the merged clinical trials list.
pub fn analyze_competition(trials: &[ResultItem]) -> CompetitionAnalysis {
    let mut active_trials = 0;
    let mut phase_distribution: BTreeMap<String, usize> = BTreeMap::new();

    for item in trials {
        let ResultPayload::Trial(trial) = &item.payload else {
            continue;
        };
        if ACTIVE_STATUSES.contains(&trial.status.as_str()) {
            active_trials += 1;
        }
        if let Some(phase) = &trial.phase {
            *phase_distribution.entry(phase.clone()).or_insert(0) += 1;
        }
    }

    let level = if active_trials < 5 {
        "low"
    } else if active_trials < 15 {
        "medium"
    } else {
        "high"
    };

    CompetitionAnalysis {
        level: level.to_string(),
        active_trials,
        total_trials: trials.len(),
        phase_distribution,
    }
}

pub fn executive_summary(query: &str, competition: &CompetitionAnalysis) -> String {
    format!(
        "Analysis of \"{query}\" found {} clinical trials ({} currently active), \
         indicating {} competitive intensity in this space.",
        competition.total_trials, competition.active_trials, competition.level
    )
}

pub fn key_findings(
    competition: &CompetitionAnalysis,
    patents: usize,
    publications: usize,
    confidence_level: &str,
) -> Vec<String> {
    let mut findings = vec![format!(
        "Evidence confidence is rated {confidence_level} based on the breadth of sources found."
    )];
    findings.push(format!(
        "{} clinical trials identified, {} in active stages.",
        competition.total_trials, competition.active_trials
    ));
    if let Some((phase, count)) = competition
        .phase_distribution
        .iter()
        .max_by_key(|(_, count)| **count)
    {
        findings.push(format!(
            "Trial activity concentrates in {phase} ({count} trials)."
        ));
    }
    findings.push(format!(
        "{patents} relevant patents located across patent sources."
    ));
    findings.push(format!(
        "{publications} scientific publications support the landscape."
    ));
    findings.push(format!(
        "Overall competition level assessed as {}.",
        competition.level
    ));
    findings
}

/// Writes the plain-text report artifact and hands back its download path.
pub struct ReportAssembler {
    reports_dir: PathBuf,
}

impl ReportAssembler {
    pub fn new(reports_dir: PathBuf) -> Self {
        Self { reports_dir }
    }

    pub fn filename(result: &AnalysisResult) -> String {
        format!("job_{}.txt", result.job_id)
    }

    fn render(result: &AnalysisResult) -> String {
        let mut out = String::new();
        out.push_str("PHARMACEUTICAL INTELLIGENCE REPORT\n");
        out.push_str("==================================\n\n");
        out.push_str(&format!("Query: {}\n", result.query));
        out.push_str(&format!("Job: {}\n", result.job_id));
        out.push_str(&format!("Generated: {}\n\n", result.completed_at.to_rfc3339()));

        out.push_str("EXECUTIVE SUMMARY\n-----------------\n");
        out.push_str(&result.executive_summary);
        out.push_str("\n\n");

        out.push_str("KEY FINDINGS\n------------\n");
        for finding in &result.key_findings {
            out.push_str(&format!("- {finding}\n"));
        }
        out.push('\n');

        out.push_str(&format!(
            "CONFIDENCE: {} ({:.1}/100)\n\n",
            result.confidence_level, result.confidence_score
        ));

        for (heading, items) in [
            ("CLINICAL TRIALS", &result.clinical_trials),
            ("PATENTS", &result.patents),
            ("WEB INTELLIGENCE", &result.web_intel),
        ] {
            out.push_str(&format!("{heading} ({})\n", items.len()));
            out.push_str(&format!("{}\n", "-".repeat(heading.len())));
            for item in items {
                out.push_str(&format!("  [{}] {}\n", item.canonical_id, item.title));
            }
            out.push('\n');
        }
        out
    }

    /// Best effort: a write failure is logged and the result simply ships
    /// without a report link.
    pub async fn write(&self, result: &AnalysisResult) -> Option<String> {
        let filename = Self::filename(result);
        let path = self.reports_dir.join(&filename);
        let body = Self::render(result);

        if let Err(e) = tokio::fs::create_dir_all(&self.reports_dir).await {
            tracing::warn!(error = %e, "could not create reports directory");
            return None;
        }
        match tokio::fs::write(&path, body).await {
            Ok(()) => Some(format!("/api/reports/{filename}")),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "report write failed");
                None
            }
        }
    }
}
