//! Stale classification.
//!
//! Pure functions over an activity map; the tracker calls them while holding
//! its write lock so classification and removal are one step.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// `now - window`, or `None` when that reaches back before the clock's origin
/// (in which case nothing can be older than the cutoff).
pub fn cutoff(now: Instant, window: Duration) -> Option<Instant> {
    now.checked_sub(window)
}

/// Remove and return every key last seen strictly before `cutoff`.
pub fn drain_stale<K>(records: &mut HashMap<K, Instant>, cutoff: Instant) -> Vec<K>
where
    K: Clone + Eq + Hash,
{
    let mut stale = Vec::new();
    records.retain(|key, last_seen| {
        if *last_seen < cutoff {
            stale.push(key.clone());
            false
        } else {
            true
        }
    });
    stale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_only_records_before_cutoff() {
        let t0 = Instant::now();
        let mut records = HashMap::new();
        records.insert("old", t0);
        records.insert("edge", t0 + Duration::from_secs(60));
        records.insert("new", t0 + Duration::from_secs(120));

        let stale = drain_stale(&mut records, t0 + Duration::from_secs(60));

        assert_eq!(stale, vec!["old"]);
        assert_eq!(records.len(), 2);
        assert!(records.contains_key("edge"));
        assert!(records.contains_key("new"));
    }

    #[test]
    fn second_drain_is_empty() {
        let t0 = Instant::now();
        let mut records = HashMap::from([("a", t0), ("b", t0)]);
        let cut = t0 + Duration::from_secs(1);

        assert_eq!(drain_stale(&mut records, cut).len(), 2);
        assert!(drain_stale(&mut records, cut).is_empty());
    }

    #[test]
    fn cutoff_before_origin_is_none() {
        let now = Instant::now();
        assert_eq!(cutoff(now, Duration::ZERO), Some(now));
        assert!(cutoff(now, Duration::MAX).is_none());
    }
}
