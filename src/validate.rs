//! Pure metadata validators.
//!
//! Scalar checks return a description on failure; the aggregate checks fold
//! them into `FieldViolation` lists using the `.meta.labels[i]` path style.
//! Nothing here panics and nothing here touches storage.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::api::{NamespacedName, ObjectMeta};
use crate::error::FieldViolation;
use crate::limits::Limits;

/// Longest RFC 1035 DNS label.
pub const MAX_LABEL_LEN: usize = 63;
/// Longest RFC 1035 DNS subdomain.
pub const MAX_SUBDOMAIN_LEN: usize = 253;
/// Longest (qualified) key segment.
pub const MAX_KEY_LEN: usize = 63;

pub(crate) const NOT_EMPTY: &str = "must not be empty";
pub(crate) const IMMUTABLE: &str = "immutable";

/// RFC 1035 DNS label: lowercase, starts with a letter, ends alphanumeric,
/// only `[a-z0-9-]` in between, at most 63 characters.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.len() > MAX_LABEL_LEN {
        return Err(format!("must be {MAX_LABEL_LEN} characters or less"));
    }
    let bytes = name.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return Err(NOT_EMPTY.to_string());
    };
    if !first.is_ascii_lowercase() {
        return Err("must start with a lowercase letter".to_string());
    }
    if let Some((&last, inner)) = rest.split_last() {
        if !last.is_ascii_lowercase() && !last.is_ascii_digit() {
            return Err("must end with a lowercase alphanumeric character".to_string());
        }
        for &b in inner {
            if !b.is_ascii_lowercase() && !b.is_ascii_digit() && b != b'-' {
                return Err(
                    "must contain only lowercase alphanumeric characters or '-'".to_string()
                );
            }
        }
    }
    Ok(())
}

/// RFC 1035 DNS subdomain: dot-separated labels, at most 253 characters.
pub fn validate_namespace(namespace: &str) -> Result<(), String> {
    if namespace.is_empty() {
        return Err(NOT_EMPTY.to_string());
    }
    if namespace.len() > MAX_SUBDOMAIN_LEN {
        return Err(format!("must be {MAX_SUBDOMAIN_LEN} characters or less"));
    }
    for label in namespace.split('.') {
        validate_name(label).map_err(|reason| format!("label {label:?}: {reason}"))?;
    }
    Ok(())
}

/// Key segment: alphanumeric at both ends, `[-_.a-zA-Z0-9]` in between,
/// at most 63 characters.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.len() > MAX_KEY_LEN {
        return Err(format!("must be {MAX_KEY_LEN} characters or less"));
    }
    let bytes = key.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return Err(NOT_EMPTY.to_string());
    };
    if !first.is_ascii_alphanumeric() {
        return Err("must start with an alphanumeric character".to_string());
    }
    if let Some((&last, inner)) = rest.split_last() {
        if !last.is_ascii_alphanumeric() {
            return Err("must end with an alphanumeric character".to_string());
        }
        for &b in inner {
            if !b.is_ascii_alphanumeric() && b != b'-' && b != b'_' && b != b'.' {
                return Err(
                    "must contain only alphanumeric characters, '-', '_' or '.'".to_string(),
                );
            }
        }
    }
    Ok(())
}

/// Qualified key: a key segment, optionally prefixed by `subdomain/`.
/// The empty string is accepted (absent key).
pub fn validate_qualified_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Ok(());
    }
    let (prefix, name) = match key.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    validate_key(name)?;
    if let Some(prefix) = prefix {
        validate_namespace(prefix).map_err(|reason| format!("prefix: {reason}"))?;
    }
    Ok(())
}

/// Canonical RFC 4122 form.
pub fn validate_uid(uid: &str) -> Result<(), String> {
    Uuid::parse_str(uid)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

/// Validates the address used for `Get`-style lookups.
pub fn validate_namespaced_name(nn: &NamespacedName) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    if let Err(reason) = validate_name(&nn.name) {
        violations.push(FieldViolation::new("name", reason));
    }
    if !nn.namespace.is_empty()
        && let Err(reason) = validate_namespace(&nn.namespace)
    {
        violations.push(FieldViolation::new("namespace", reason));
    }
    violations
}

/// Full metadata check applied by admission on every mutation.
pub fn validate_metadata(meta: &ObjectMeta, namespaced: bool, limits: &Limits) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if meta.name.is_empty() {
        violations.push(FieldViolation::new(".meta.name", NOT_EMPTY));
    } else if let Err(reason) = validate_name(&meta.name) {
        violations.push(FieldViolation::new(".meta.name", reason));
    }

    if namespaced {
        if meta.namespace.is_empty() {
            violations.push(FieldViolation::new(".meta.namespace", NOT_EMPTY));
        } else if let Err(reason) = validate_namespace(&meta.namespace) {
            violations.push(FieldViolation::new(".meta.namespace", reason));
        }
    } else if !meta.namespace.is_empty()
        && let Err(reason) = validate_namespace(&meta.namespace)
    {
        violations.push(FieldViolation::new(".meta.namespace", reason));
    }

    for (i, (key, value)) in meta.labels.iter().enumerate() {
        if let Err(reason) = validate_qualified_key(key) {
            violations.push(FieldViolation::new(
                format!(".meta.labels[{i}]"),
                format!("invalid key: {reason}"),
            ));
        }
        if value.len() > limits.max_label_value_len {
            violations.push(FieldViolation::new(
                format!(".meta.labels[{i}]"),
                format!(
                    "invalid value: must be {} characters or less",
                    limits.max_label_value_len
                ),
            ));
        } else if let Err(reason) = validate_key(value) {
            violations.push(FieldViolation::new(
                format!(".meta.labels[{i}]"),
                format!("invalid value: {reason}"),
            ));
        }
    }

    for (i, (key, value)) in meta.annotations.iter().enumerate() {
        if let Err(reason) = validate_qualified_key(key) {
            violations.push(FieldViolation::new(
                format!(".meta.annotations[{i}]"),
                format!("invalid key: {reason}"),
            ));
        }
        if value.len() > limits.max_annotation_value_bytes {
            violations.push(FieldViolation::new(
                format!(".meta.annotations[{i}]"),
                format!(
                    "invalid value: must be {} bytes or less",
                    limits.max_annotation_value_bytes
                ),
            ));
        }
    }

    let mut seen = BTreeSet::new();
    for (i, finalizer) in meta.finalizers.iter().enumerate() {
        if !seen.insert(finalizer) {
            violations.push(FieldViolation::new(
                format!(".meta.finalizers[{i}]"),
                "finalizers cannot contain the same key more than once",
            ));
        }
        if let Err(reason) = validate_qualified_key(finalizer) {
            violations.push(FieldViolation::new(format!(".meta.finalizers[{i}]"), reason));
        }
    }

    if !meta.uid.is_empty()
        && let Err(reason) = validate_uid(&meta.uid)
    {
        violations.push(FieldViolation::new(".meta.uid", reason));
    }

    violations
}

/// Immutability checks for updates against the stored record.
///
/// Once `deleted_timestamp` is set it cannot change and no finalizer may be
/// added; the structural only-finalizers-change rule needs the full objects
/// and lives in the generic admission validator.
pub fn validate_update_metadata(new: &ObjectMeta, old: &ObjectMeta) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if new.generate_name != old.generate_name {
        violations.push(FieldViolation::new(".meta.generateName", IMMUTABLE));
    }
    if new.uid != old.uid {
        violations.push(FieldViolation::new(".meta.uid", IMMUTABLE));
    }
    if new.created_timestamp != old.created_timestamp {
        violations.push(FieldViolation::new(".meta.createdTimestamp", IMMUTABLE));
    }

    if old.deleted_timestamp.is_some() {
        if new.deleted_timestamp != old.deleted_timestamp {
            violations.push(FieldViolation::new(
                ".meta.deletedTimestamp",
                "immutable after being set",
            ));
        }
        let old_finalizers: BTreeSet<&String> = old.finalizers.iter().collect();
        for (i, finalizer) in new.finalizers.iter().enumerate() {
            if !old_finalizers.contains(finalizer) {
                violations.push(FieldViolation::new(
                    format!(".meta.finalizers[{i}]"),
                    "cannot add finalizers after deletion",
                ));
            }
        }
    }

    violations
}
