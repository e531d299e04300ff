//! Labeled metric families backed by `DashMap`.
//!
//! Labels are flattened into sorted key vectors to keep deterministic ordering
//! and so a partial label set can be matched with a binary search per label.
//! Deleting by partial match is a first-class operation here: the GC evicts
//! every series of a stale identity without knowing the other label values
//! (status, operation, error...) those series carry.
//!
//! Each family is declared with its label names. A write whose names differ
//! from the declared ones is dropped, so one family never mixes two label
//! schemas.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use tracing::debug;

use rfo_metrics_core::LabelSet;

type SeriesKey = Vec<(String, String)>;

fn series_key(labels: &[(&str, &str)]) -> SeriesKey {
    let mut key: SeriesKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

/// Declared label names of a family, kept sorted like series keys.
struct LabelSchema(Vec<String>);

impl LabelSchema {
    fn new(names: &[&str]) -> Self {
        let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        names.sort();
        names.dedup();
        Self(names)
    }

    fn admits(&self, key: &SeriesKey) -> bool {
        key.len() == self.0.len() && key.iter().zip(&self.0).all(|((k, _), n)| k == n)
    }

    fn carries_all(&self, labels: &LabelSet) -> bool {
        labels
            .iter()
            .all(|(name, _)| self.0.binary_search_by(|n| n.as_str().cmp(name)).is_ok())
    }

    /// Series key for `labels`, or `None` if they do not fit the schema.
    fn key(&self, family: &str, labels: &[(&str, &str)]) -> Option<SeriesKey> {
        let key = series_key(labels);
        if self.admits(&key) {
            return Some(key);
        }
        debug!(
            event.name = "metrics.family.label_mismatch",
            family = family,
            expected = ?self.0,
            got = ?key.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            "dropping write with undeclared label names"
        );
        None
    }
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn render_series(out: &mut String, name: &str, key: &SeriesKey, val: impl std::fmt::Display) {
    if key.is_empty() {
        let _ = writeln!(out, "{} {}", name, val);
        return;
    }
    let label_str = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    let _ = writeln!(out, "{}{{{}}} {}", name, label_str, val);
}

/// Removes the series of a family that match a partial label set.
pub trait PartialDelete: Send + Sync {
    fn name(&self) -> &str;

    /// Delete every series whose labels are a superset of `labels`.
    /// Returns the number of series removed.
    fn delete_partial_match(&self, labels: &LabelSet) -> usize;
}

fn retain_unmatched<V>(
    map: &DashMap<SeriesKey, V>,
    schema: &LabelSchema,
    labels: &LabelSet,
) -> usize {
    if labels.is_empty() || !schema.carries_all(labels) {
        return 0;
    }
    let mut deleted = 0;
    map.retain(|key, _| {
        if labels.is_subset_of(key) {
            deleted += 1;
            false
        } else {
            true
        }
    });
    deleted
}

pub struct CounterVec {
    name: String,
    help: String,
    schema: LabelSchema,
    map: DashMap<SeriesKey, AtomicU64>,
}

impl CounterVec {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            schema: LabelSchema::new(label_names),
            map: DashMap::new(),
        }
    }

    /// Declared label names, sorted.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.schema.0.iter().map(String::as_str)
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let Some(key) = self.schema.key(&self.name, labels) else {
            return;
        };
        let counter = self.map.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map
            .get(&series_key(labels))
            .map(|c| c.value().load(Ordering::Relaxed))
    }

    /// Remove one exact series. Returns whether it existed.
    pub fn delete(&self, labels: &[(&str, &str)]) -> bool {
        self.map.remove(&series_key(labels)).is_some()
    }

    /// Number of live series.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(out, "# TYPE {} counter", self.name);
        for r in self.map.iter() {
            render_series(out, &self.name, r.key(), r.value().load(Ordering::Relaxed));
        }
    }
}

impl PartialDelete for CounterVec {
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_partial_match(&self, labels: &LabelSet) -> usize {
        retain_unmatched(&self.map, &self.schema, labels)
    }
}

pub struct GaugeVec {
    name: String,
    help: String,
    schema: LabelSchema,
    map: DashMap<SeriesKey, AtomicI64>,
}

impl GaugeVec {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_names: &[&str]) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            schema: LabelSchema::new(label_names),
            map: DashMap::new(),
        }
    }

    /// Declared label names, sorted.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.schema.0.iter().map(String::as_str)
    }

    /// Overwrite the value.
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let Some(key) = self.schema.key(&self.name, labels) else {
            return;
        };
        let gauge = self.map.entry(key).or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }
    /// Decrement by 1.
    pub fn dec(&self, labels: &[(&str, &str)]) {
        self.add(labels, -1);
    }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let Some(key) = self.schema.key(&self.name, labels) else {
            return;
        };
        let gauge = self.map.entry(key).or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<i64> {
        self.map
            .get(&series_key(labels))
            .map(|g| g.value().load(Ordering::Relaxed))
    }

    /// Remove one exact series. Returns whether it existed.
    pub fn delete(&self, labels: &[(&str, &str)]) -> bool {
        self.map.remove(&series_key(labels)).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(out, "# TYPE {} gauge", self.name);
        for r in self.map.iter() {
            render_series(out, &self.name, r.key(), r.value().load(Ordering::Relaxed));
        }
    }
}

impl PartialDelete for GaugeVec {
    fn name(&self) -> &str {
        &self.name
    }

    fn delete_partial_match(&self, labels: &LabelSet) -> usize {
        retain_unmatched(&self.map, &self.schema, labels)
    }
}
