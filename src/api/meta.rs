//! Record metadata carried by every stored object.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Server-managed and user-supplied metadata for one record.
///
/// `uid`, `created_timestamp` and `generate_name` never change after create.
/// `resource_version` is an opaque per-type sequence token; clients only ever
/// round-trip it. `deleted_timestamp` transitions unset → set exactly once,
/// after which only `finalizers` may shrink.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Unique user-chosen ID within `namespace`; RFC 1035 DNS label.
    pub name: String,
    /// Keyspace of the record; RFC 1035 DNS subdomain, empty for global types.
    pub namespace: String,
    /// Optional prefix used to generate `name` on create.
    pub generate_name: String,
    /// UUIDv4 assigned by the store on create.
    pub uid: String,
    /// Per-type monotonic sequence, encoded as decimal text.
    pub resource_version: String,
    /// Incremented on every non-status update; starts at 1.
    pub generation: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_timestamp: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_timestamp: Option<OffsetDateTime>,
    /// Qualified keys that delay physical removal; unique, ordered.
    pub finalizers: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// Whether the record is marked for deletion but kept alive by finalizers.
    pub fn is_terminating(&self) -> bool {
        self.deleted_timestamp.is_some()
    }
}

/// Back-reference to the record that owns this one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OwnerReference {
    pub type_name: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

/// Canonical record address: `namespace + "/" + name` is the storage key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Address of a global (non-namespaced) record.
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
        }
    }

    pub fn of_meta(meta: &ObjectMeta) -> Self {
        Self {
            namespace: meta.namespace.clone(),
            name: meta.name.clone(),
        }
    }

    /// The storage key, `namespace/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
