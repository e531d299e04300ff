//! Label sets and the vocabulary that projects identities onto them.
//!
//! One resource identity is exported by several metric families under
//! different label names: `{namespace, kind, name}` for Kubernetes-object
//! families, `{namespace, resource}` for health-check families and
//! `{namespace, name}` for the cluster gauge. `LabelVocabulary` holds those
//! names so the recorder and the scanner always agree on them.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{MetricsError, Result};
use crate::identity::ResourceIdentity;

/// Ordered label name -> value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every pair in `self` appears in `series`.
    ///
    /// `series` must be sorted by label name (the metric families keep their
    /// series keys sorted). An empty set is never a subset: it would match
    /// every series of a family.
    pub fn is_subset_of(&self, series: &[(String, String)]) -> bool {
        if self.0.is_empty() {
            return false;
        }
        self.0.iter().all(|(name, value)| {
            series
                .binary_search_by(|(k, _)| k.as_str().cmp(name.as_str()))
                .map(|i| &series[i].1 == value)
                .unwrap_or(false)
        })
    }
}

/// Label names used for each identity component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelVocabulary {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_resource")]
    pub resource: String,
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            kind: default_kind(),
            name: default_name(),
            resource: default_resource(),
            address: default_address(),
        }
    }
}

fn default_namespace() -> String {
    "namespace".into()
}
fn default_kind() -> String {
    "kind".into()
}
fn default_name() -> String {
    "name".into()
}
fn default_resource() -> String {
    "resource".into()
}
fn default_address() -> String {
    "IP".into()
}

impl LabelVocabulary {
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("namespace", &self.namespace),
            ("kind", &self.kind),
            ("name", &self.name),
            ("resource", &self.resource),
            ("address", &self.address),
        ];
        for (field, value) in &names {
            if !is_label_name(value) {
                return Err(MetricsError::BadConfig(format!(
                    "labels.{field} is not a valid label name: {value:?}"
                )));
            }
        }
        for (i, (a_field, a)) in names.iter().enumerate() {
            for (b_field, b) in &names[i + 1..] {
                if a == b {
                    return Err(MetricsError::BadConfig(format!(
                        "labels.{a_field} and labels.{b_field} must differ (both {a:?})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// `{namespace, kind, name}`
    pub fn kubernetes_labels(&self, id: &ResourceIdentity) -> LabelSet {
        LabelSet::from_pairs([
            (self.namespace.as_str(), id.namespace.as_str()),
            (self.kind.as_str(), id.kind.as_str()),
            (self.name.as_str(), id.name.as_str()),
        ])
    }

    /// `{namespace, resource}`, with the identity's name as the resource.
    pub fn custom_resource_labels(&self, id: &ResourceIdentity) -> LabelSet {
        LabelSet::from_pairs([
            (self.namespace.as_str(), id.namespace.as_str()),
            (self.resource.as_str(), id.name.as_str()),
        ])
    }

    /// `{address}`
    pub fn instance_labels(&self, address: &str) -> LabelSet {
        LabelSet::from_pairs([(self.address.as_str(), address)])
    }

    /// Rename `resource` to `name` in a custom-resource set, keeping only the
    /// namespace. Returns `None` when either label is missing.
    pub fn narrow_custom_resource(&self, labels: &LabelSet) -> Option<LabelSet> {
        let namespace = labels.get(&self.namespace)?;
        let resource = labels.get(&self.resource)?;
        Some(LabelSet::from_pairs([
            (self.namespace.as_str(), namespace),
            (self.name.as_str(), resource),
        ]))
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Output of one stale scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaleLabels {
    pub kubernetes: Vec<LabelSet>,
    pub custom_resource: Vec<LabelSet>,
    pub instance: Vec<LabelSet>,
}

impl StaleLabels {
    pub fn is_empty(&self) -> bool {
        self.kubernetes.is_empty() && self.custom_resource.is_empty() && self.instance.is_empty()
    }

    /// Number of evicted identities (a resource counts once even though it
    /// yields two sets).
    pub fn len(&self) -> usize {
        self.kubernetes.len() + self.instance.len()
    }
    /// Append the sets of `other`.
    pub fn merge(&mut self, other: StaleLabels) {
        self.kubernetes.extend(other.kubernetes);
        self.custom_resource.extend(other.custom_resource);
        self.instance.extend(other.instance);
    }
}
