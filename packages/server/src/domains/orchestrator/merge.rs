//! Cross-provider dedup and merge for one domain.
//!
//! Providers are merged in priority order (registry position, index 0
//! highest). The first provider to surface a canonical id owns the record;
//! later duplicates only contribute optional fields the owner is missing.
//! Insertion order is preserved so higher-priority providers rank first.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::common::ResultItem;

/// One provider's successful contribution to a domain.
pub struct ProviderResults {
    pub provider: &'static str,
    /// Registry position, lower wins on duplicate canonical ids.
    pub priority: usize,
    pub items: Vec<ResultItem>,
}

/// Merge provider result lists into one deduplicated domain list.
pub fn merge_provider_results(mut batches: Vec<ProviderResults>) -> Vec<ResultItem> {
    batches.sort_by_key(|b| b.priority);

    let mut merged: IndexMap<String, ResultItem> = IndexMap::new();
    for batch in batches {
        for item in batch.items {
            match merged.entry(item.canonical_id.clone()) {
                indexmap::map::Entry::Occupied(mut kept) => {
                    kept.get_mut().absorb(&item);
                }
                indexmap::map::Entry::Vacant(slot) => {
                    slot.insert(item);
                }
            }
        }
    }
    merged.into_values().collect()
}

/// Post-merge ordering hook applied to each domain's deduplicated list.
pub trait ResultRanker: Send + Sync {
    fn rank(&self, items: Vec<ResultItem>) -> Vec<ResultItem>;
}

/// Keeps merge order: provider priority first, provider-native order within.
pub struct IdentityRanker;

impl ResultRanker for IdentityRanker {
    fn rank(&self, items: Vec<ResultItem>) -> Vec<ResultItem> {
        items
    }
}

/// Orders by provider relevance score, descending; unscored items keep their
/// merge position after all scored ones.
pub struct ScoreRanker;

impl ResultRanker for ScoreRanker {
    fn rank(&self, mut items: Vec<ResultItem>) -> Vec<ResultItem> {
        items.sort_by(|a, b| {
            let a = a.score.unwrap_or(f64::MIN);
            let b = b.score.unwrap_or(f64::MIN);
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        items
    }
}

pub fn default_ranker() -> Arc<dyn ResultRanker> {
    Arc::new(IdentityRanker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ResultPayload, TrialRecord};

    fn item(id: &str, source: &str, sponsor: Option<&str>, score: Option<f64>) -> ResultItem {
        ResultItem {
            canonical_id: id.to_string(),
            title: format!("Trial {id}"),
            source: source.to_string(),
            score,
            payload: ResultPayload::Trial(TrialRecord {
                status: "RECRUITING".to_string(),
                sponsor: sponsor.map(str::to_string),
                source_url: format!("https://clinicaltrials.gov/study/{id}"),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn overlapping_ids_collapse_to_priority_owner() {
        // 5 from the primary, 3 from the secondary, 2 shared: 6 unique.
        let primary = ProviderResults {
            provider: "a",
            priority: 0,
            items: vec![
                item("NCT1", "a", None, None),
                item("NCT2", "a", None, None),
                item("NCT3", "a", None, None),
                item("NCT4", "a", None, None),
                item("NCT5", "a", None, None),
            ],
        };
        let secondary = ProviderResults {
            provider: "b",
            priority: 1,
            items: vec![
                item("NCT4", "b", Some("Acme"), Some(0.9)),
                item("NCT5", "b", None, None),
                item("NCT6", "b", None, None),
            ],
        };

        // Completion order is arbitrary; priority decides, not arrival.
        let merged = merge_provider_results(vec![secondary, primary]);

        assert_eq!(merged.len(), 6);
        let nct4 = merged.iter().find(|i| i.canonical_id == "NCT4").unwrap();
        assert_eq!(nct4.source, "a");
        assert_eq!(nct4.score, Some(0.9));
        let ResultPayload::Trial(t) = &nct4.payload else {
            panic!("wrong payload kind");
        };
        assert_eq!(t.sponsor.as_deref(), Some("Acme"));
    }

    #[test]
    fn merge_preserves_priority_then_native_order() {
        let merged = merge_provider_results(vec![
            ProviderResults {
                provider: "b",
                priority: 1,
                items: vec![item("X3", "b", None, None), item("X4", "b", None, None)],
            },
            ProviderResults {
                provider: "a",
                priority: 0,
                items: vec![item("X1", "a", None, None), item("X2", "a", None, None)],
            },
        ]);
        let ids: Vec<_> = merged.iter().map(|i| i.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["X1", "X2", "X3", "X4"]);
    }

    #[test]
    fn score_ranker_sorts_descending_with_unscored_last() {
        let ranked = ScoreRanker.rank(vec![
            item("L1", "a", None, Some(0.4)),
            item("L2", "a", None, None),
            item("L3", "a", None, Some(0.9)),
        ]);
        let ids: Vec<_> = ranked.iter().map(|i| i.canonical_id.as_str()).collect();
        assert_eq!(ids, vec!["L3", "L1", "L2"]);
    }
}
