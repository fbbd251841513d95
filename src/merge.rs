use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::ScanRecord;

/// Rank used for ordering and duplicate resolution. A record without a
/// metric sorts below any record that has one.
fn rank(metric: Option<f64>) -> f64 {
    metric.unwrap_or(f64::NEG_INFINITY)
}

/// Fold a freshly fetched batch into the bounded top-K set.
///
/// Union is keyed by `key`; when a key appears on both sides the record with
/// the larger metric wins wholesale, so the retained metric is a high-water
/// mark (a later, smaller sample of the same key never lowers it). The union
/// is sorted descending by metric (ties broken by key ascending, a
/// deterministic but otherwise arbitrary choice) and truncated to `bound`.
/// Evicted entries are forgotten; they only come back if a later page
/// resurfaces them with a competitive metric. Bounded memory is the point.
pub fn merge_top_k(current: &[ScanRecord], incoming: &[ScanRecord], bound: usize) -> Vec<ScanRecord> {
    let mut union: HashMap<&str, &ScanRecord> =
        HashMap::with_capacity(current.len() + incoming.len());
    for record in current.iter().chain(incoming) {
        union
            .entry(record.key.as_str())
            .and_modify(|held| {
                if rank(record.metric).total_cmp(&rank(held.metric)) == Ordering::Greater {
                    *held = record;
                }
            })
            .or_insert(record);
    }

    let mut merged: Vec<ScanRecord> = union.into_values().cloned().collect();
    merged.sort_by(|a, b| {
        rank(b.metric)
            .total_cmp(&rank(a.metric))
            .then_with(|| a.key.cmp(&b.key))
    });
    merged.truncate(bound);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &str, metric: f64) -> ScanRecord {
        ScanRecord {
            key: key.to_string(),
            kind: Some("string".to_string()),
            metric: Some(metric),
        }
    }

    #[test]
    fn duplicate_key_keeps_high_water_mark() {
        let current = vec![rec("a", 10.0), rec("b", 20.0)];
        let incoming = vec![rec("a", 15.0)];
        let merged = merge_top_k(&current, &incoming, 10);
        assert_eq!(merged, vec![rec("b", 20.0), rec("a", 15.0)]);
    }

    #[test]
    fn smaller_resample_never_lowers_the_mark() {
        let current = vec![rec("a", 15.0)];
        let incoming = vec![rec("a", 10.0)];
        let merged = merge_top_k(&current, &incoming, 10);
        assert_eq!(merged, vec![rec("a", 15.0)]);
    }

    #[test]
    fn truncates_to_bound_after_resolving_duplicates() {
        let current = vec![rec("a", 100.0), rec("b", 200.0), rec("c", 20.0)];
        let incoming = vec![rec("a", 105.0)];
        let merged = merge_top_k(&current, &incoming, 2);
        assert_eq!(merged, vec![rec("b", 200.0), rec("a", 105.0)]);
    }

    #[test]
    fn bound_and_uniqueness_hold_for_larger_unions() {
        let current: Vec<ScanRecord> = (0..40).map(|i| rec(&format!("k{i:02}"), i as f64)).collect();
        let incoming: Vec<ScanRecord> =
            (20..60).map(|i| rec(&format!("k{i:02}"), (i * 3) as f64)).collect();
        let merged = merge_top_k(&current, &incoming, 25);
        assert_eq!(merged.len(), 25);
        let mut keys: Vec<&str> = merged.iter().map(|r| r.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 25, "every key appears at most once");
        for pair in merged.windows(2) {
            assert!(rank(pair[0].metric) >= rank(pair[1].metric));
        }
    }

    #[test]
    fn missing_metric_ranks_below_any_present_metric() {
        let current = vec![ScanRecord {
            key: "bare".to_string(),
            kind: None,
            metric: None,
        }];
        let incoming = vec![rec("tiny", 0.0)];
        let merged = merge_top_k(&current, &incoming, 1);
        assert_eq!(merged[0].key, "tiny");
    }

    #[test]
    fn zero_bound_yields_empty_set() {
        let merged = merge_top_k(&[rec("a", 1.0)], &[rec("b", 2.0)], 0);
        assert!(merged.is_empty());
    }
}
