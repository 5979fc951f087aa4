//! Option structs for read, watch and bulk-delete operations.

use std::collections::{BTreeMap, BTreeSet};

/// Label selector: equality requirements plus existence requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    match_labels: BTreeMap<String, String>,
    has_labels: BTreeSet<String>,
}

impl Selector {
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.has_labels.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
            && self.has_labels.iter().all(|key| labels.contains_key(key))
    }

    fn require_eq(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.match_labels.insert(key.into(), value.into());
    }

    fn require_exists(&mut self, key: impl Into<String>) {
        self.has_labels.insert(key.into());
    }
}

/// Options for `List` and the list half of `Watch`/`DeleteAllOf`.
///
/// `namespace: None` means all namespaces; `Some("")` selects global records
/// only (their storage keys have an empty namespace segment).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub namespace: Option<String>,
    pub selector: Selector,
}

impl ListOptions {
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn match_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in labels {
            self.selector.require_eq(key, value);
        }
        self
    }

    pub fn has_labels<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        for key in keys {
            self.selector.require_exists(key);
        }
        self
    }

    /// Storage-key prefix implied by the namespace filter.
    pub(crate) fn key_prefix(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}/"),
            None => String::new(),
        }
    }
}

/// Options for `Watch`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WatchOptions {
    pub list: ListOptions,
    /// Resume after this resource version instead of seeding from a snapshot.
    pub resume_from: Option<String>,
}

impl WatchOptions {
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.list = self.list.in_namespace(namespace);
        self
    }

    pub fn match_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.list = self.list.match_labels(labels);
        self
    }

    pub fn has_labels<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.list = self.list.has_labels(keys);
        self
    }

    pub fn resume_from(mut self, resource_version: impl Into<String>) -> Self {
        self.resume_from = Some(resource_version.into());
        self
    }
}

/// Options for `DeleteAllOf`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteAllOfOptions {
    pub list: ListOptions,
}

impl DeleteAllOfOptions {
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.list = self.list.in_namespace(namespace);
        self
    }

    pub fn match_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.list = self.list.match_labels(labels);
        self
    }

    pub fn has_labels<K: Into<String>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.list = self.list.has_labels(keys);
        self
    }
}
