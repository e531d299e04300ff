//! Last-activity tracking for resource and instance identities.
//!
//! Every recorded metric touches the identity it belongs to; the GC sweep asks
//! the tracker which identities went quiet for longer than the staleness
//! window and gets back the label sets to evict.
//!
//! Both maps sit behind a single `RwLock`. `scan_stale` classifies and removes
//! under one write guard, so an identity is never reported stale while still
//! tracked. A touch racing a scan either lands before it (and is evicted with
//! it) or after it (and survives with a fresh timestamp); both outcomes heal
//! on the next touch.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::clock::{Clock, SystemClock};
use crate::identity::ResourceIdentity;
use crate::labels::{LabelVocabulary, StaleLabels};
use crate::scan;

#[derive(Default)]
struct TrackerState {
    resources: HashMap<ResourceIdentity, Instant>,
    instances: HashMap<String, Instant>,
}

pub struct IdentityTracker {
    state: RwLock<TrackerState>,
    vocabulary: LabelVocabulary,
    clock: Arc<dyn Clock>,
}

impl IdentityTracker {
    pub fn new(vocabulary: LabelVocabulary) -> Self {
        Self::with_clock(vocabulary, Arc::new(SystemClock))
    }

    pub fn with_clock(vocabulary: LabelVocabulary, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            vocabulary,
            clock,
        }
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    // A panic elsewhere while holding the guard leaves both maps valid, so a
    // poisoned lock is simply recovered.
    fn read(&self) -> RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a resource as active now.
    pub fn touch_resource(&self, namespace: &str, kind: &str, name: &str) {
        let id = ResourceIdentity::new(namespace, kind, name);
        let mut state = self.write();
        // read under the guard so stored timestamps never go backwards
        let now = self.clock.now();
        state.resources.insert(id, now);
    }

    /// Mark an instance address as active now.
    pub fn touch_instance(&self, address: &str) {
        let address = address.to_string();
        let mut state = self.write();
        let now = self.clock.now();
        state.instances.insert(address, now);
    }

    /// Last activity recorded for a resource, if tracked.
    pub fn resource_last_seen(&self, namespace: &str, kind: &str, name: &str) -> Option<Instant> {
        self.read()
            .resources
            .get(&ResourceIdentity::new(namespace, kind, name))
            .copied()
    }

    /// Evict every identity not touched within `window` and return the label
    /// sets its series are exported under.
    ///
    /// Each stale resource yields one Kubernetes-shaped and one
    /// custom-resource-shaped set; each stale instance yields one
    /// instance-shaped set.
    pub fn scan_stale(&self, window: Duration) -> StaleLabels {
        let Some(cutoff) = scan::cutoff(self.clock.now(), window) else {
            return StaleLabels::default();
        };

        let (resources, instances) = {
            let mut state = self.write();
            (
                scan::drain_stale(&mut state.resources, cutoff),
                scan::drain_stale(&mut state.instances, cutoff),
            )
        };

        let mut out = StaleLabels::default();
        for id in &resources {
            trace!(
                event.name = "metrics.tracker.resource_stale",
                identity = %id,
                "resource identity evicted from tracker"
            );
            out.kubernetes.push(self.vocabulary.kubernetes_labels(id));
            out.custom_resource
                .push(self.vocabulary.custom_resource_labels(id));
        }
        for address in &instances {
            trace!(
                event.name = "metrics.tracker.instance_stale",
                address = %address,
                "instance identity evicted from tracker"
            );
            out.instance.push(self.vocabulary.instance_labels(address));
        }
        out
    }

    pub fn is_resource_tracked(&self, namespace: &str, kind: &str, name: &str) -> bool {
        self.read()
            .resources
            .contains_key(&ResourceIdentity::new(namespace, kind, name))
    }

    pub fn is_instance_tracked(&self, address: &str) -> bool {
        self.read().instances.contains_key(address)
    }

    pub fn tracked_resources(&self) -> usize {
        self.read().resources.len()
    }

    pub fn tracked_instances(&self) -> usize {
        self.read().instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::labels::LabelSet;

    const WINDOW: Duration = Duration::from_secs(5 * 60);

    fn minutes(n: u64) -> Duration {
        Duration::from_secs(n * 60)
    }

    fn tracker() -> (IdentityTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let t = IdentityTracker::with_clock(LabelVocabulary::default(), clock.clone());
        (t, clock)
    }

    #[test]
    fn resource_evicted_after_window() {
        let (t, clock) = tracker();
        t.touch_resource("ns1", "redisfailover", "rf1");

        clock.advance(minutes(4));
        assert!(t.scan_stale(WINDOW).is_empty());
        assert!(t.is_resource_tracked("ns1", "redisfailover", "rf1"));

        clock.advance(minutes(2));
        let stale = t.scan_stale(WINDOW);
        assert_eq!(
            stale.kubernetes,
            vec![LabelSet::from_pairs([
                ("namespace", "ns1"),
                ("kind", "redisfailover"),
                ("name", "rf1"),
            ])]
        );
        assert_eq!(
            stale.custom_resource,
            vec![LabelSet::from_pairs([("namespace", "ns1"), ("resource", "rf1")])]
        );
        assert!(stale.instance.is_empty());
        assert!(!t.is_resource_tracked("ns1", "redisfailover", "rf1"));
    }

    #[test]
    fn retouch_resets_the_clock() {
        let (t, clock) = tracker();
        t.touch_instance("10.0.0.5");
        clock.advance(minutes(3));
        t.touch_instance("10.0.0.5");

        clock.advance(minutes(1));
        assert!(t.scan_stale(WINDOW).is_empty());

        clock.advance(minutes(5));
        let stale = t.scan_stale(WINDOW);
        assert_eq!(
            stale.instance,
            vec![LabelSet::from_pairs([("IP", "10.0.0.5")])]
        );
        assert!(!t.is_instance_tracked("10.0.0.5"));
    }

    #[test]
    fn exactly_window_old_is_not_stale() {
        let (t, clock) = tracker();
        t.touch_instance("10.0.0.7");
        clock.advance(WINDOW);
        assert!(t.scan_stale(WINDOW).is_empty());
        clock.advance(Duration::from_nanos(1));
        assert_eq!(t.scan_stale(WINDOW).instance.len(), 1);
    }

    #[test]
    fn identity_spaces_are_independent() {
        let (t, clock) = tracker();
        t.touch_resource("ns1", "Pod", "rfr-rf1-0");
        t.touch_instance("10.0.0.5");
        clock.advance(minutes(6));
        t.touch_instance("10.0.0.5");

        let stale = t.scan_stale(WINDOW);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale.kubernetes.len(), 1);
        assert!(stale.instance.is_empty());
        assert_eq!(t.tracked_resources(), 0);
        assert_eq!(t.tracked_instances(), 1);
    }
}
