//! Generic validation hook.

use crate::admission::AdmissionHook;
use crate::api::Object;
use crate::context::Context;
use crate::error::{BadRequest, Error, FieldViolation};
use crate::limits::Limits;
use crate::validate;

/// Metadata validation plus the record's own optional validation capability.
///
/// Violations from the record's `validate_*` methods (when they surface as
/// [`Error::BadRequest`]) are merged with the metadata violations into a
/// single response; any other error kind aborts the pipeline verbatim.
pub struct GenericValidator {
    namespaced: bool,
    limits: Limits,
}

impl GenericValidator {
    pub fn new(namespaced: bool, limits: Limits) -> Self {
        Self { namespaced, limits }
    }

    fn finish(violations: Vec<FieldViolation>) -> Result<(), Error> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(BadRequest::new(violations).into())
        }
    }
}

/// Fold a capability result into the violation list, or abort on a
/// non-validation error.
fn merge(violations: &mut Vec<FieldViolation>, result: Result<(), Error>) -> Result<(), Error> {
    match result {
        Ok(()) => Ok(()),
        Err(Error::BadRequest(bad)) => {
            violations.extend(bad.violations);
            Ok(())
        }
        Err(other) => Err(other),
    }
}

impl<T: Object> AdmissionHook<T> for GenericValidator {
    fn on_create(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let mut violations = validate::validate_metadata(obj.meta(), self.namespaced, &self.limits);
        merge(&mut violations, obj.validate_create(cx))?;
        Self::finish(violations)
    }

    fn on_update(&self, cx: &Context, obj: &mut T, old: &T) -> Result<(), Error> {
        let mut violations = validate::validate_metadata(obj.meta(), self.namespaced, &self.limits);
        violations.extend(validate::validate_update_metadata(obj.meta(), old.meta()));

        // Terminating records accept nothing but finalizer shrinkage (and the
        // one-time deletion stamp).
        if obj.meta().deleted_timestamp.is_some() || old.meta().deleted_timestamp.is_some() {
            let mut allowed = old.clone();
            allowed.meta_mut().finalizers = obj.meta().finalizers.clone();
            allowed.meta_mut().deleted_timestamp = obj.meta().deleted_timestamp;
            if *obj != allowed {
                violations.push(FieldViolation::new(
                    ".meta.finalizers",
                    "record deleted, only finalizers can be updated",
                ));
            }
        }

        merge(&mut violations, obj.validate_update(cx, old))?;
        Self::finish(violations)
    }

    fn on_delete(&self, cx: &Context, obj: &T) -> Result<(), Error> {
        let mut violations = validate::validate_metadata(obj.meta(), self.namespaced, &self.limits);
        merge(&mut violations, obj.validate_delete(cx))?;
        Self::finish(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ObjectMeta;
    use serde::{Deserialize, Serialize};
    use time::OffsetDateTime;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        meta: ObjectMeta,
        field: String,
        #[serde(default)]
        reject_with: Option<String>,
    }

    impl Object for Doc {
        fn type_name() -> &'static str {
            "test.Doc"
        }
        fn meta(&self) -> &ObjectMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.meta
        }
        fn validate_create(&self, _cx: &Context) -> Result<(), Error> {
            match &self.reject_with {
                Some(reason) => Err(BadRequest::single(".field", reason.clone()).into()),
                None => Ok(()),
            }
        }
    }

    fn valid_doc() -> Doc {
        Doc {
            meta: ObjectMeta {
                name: "a".into(),
                namespace: "ns".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn validator() -> GenericValidator {
        GenericValidator::new(true, Limits::default())
    }

    #[test]
    fn valid_create_passes() {
        let cx = Context::background();
        let mut doc = valid_doc();
        AdmissionHook::<Doc>::on_create(&validator(), &cx, &mut doc).unwrap();
    }

    #[test]
    fn capability_violations_merge_with_metadata_violations() {
        let cx = Context::background();
        let mut doc = Doc {
            reject_with: Some("spec broken".into()),
            ..valid_doc()
        };
        doc.meta.name = String::new();

        let err = AdmissionHook::<Doc>::on_create(&validator(), &cx, &mut doc).unwrap_err();
        let Error::BadRequest(bad) = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        let fields: Vec<&str> = bad.violations.iter().map(|v| v.field.as_str()).collect();
        assert!(fields.contains(&".meta.name"));
        assert!(fields.contains(&".field"));
    }

    #[test]
    fn terminating_records_only_accept_finalizer_changes() {
        let cx = Context::background();
        let mut old = valid_doc();
        old.meta.deleted_timestamp = Some(OffsetDateTime::UNIX_EPOCH);
        old.meta.finalizers = vec!["keep".into(), "drop".into()];
        old.field = "stored".into();

        // Shrinking finalizers is fine.
        let mut ok = old.clone();
        ok.meta.finalizers = vec!["keep".into()];
        AdmissionHook::<Doc>::on_update(&validator(), &cx, &mut ok, &old).unwrap();

        // Touching the spec is not.
        let mut bad = old.clone();
        bad.meta.finalizers = vec!["keep".into()];
        bad.field = "changed".into();
        let err = AdmissionHook::<Doc>::on_update(&validator(), &cx, &mut bad, &old).unwrap_err();
        let Error::BadRequest(bad) = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        assert!(bad.violations.iter().any(|v| v.field == ".meta.finalizers"));
    }

    #[test]
    fn setting_the_deletion_stamp_through_update_is_allowed() {
        let cx = Context::background();
        let mut old = valid_doc();
        old.meta.finalizers = vec!["keep".into()];

        let mut new = old.clone();
        new.meta.deleted_timestamp = Some(OffsetDateTime::UNIX_EPOCH);
        AdmissionHook::<Doc>::on_update(&validator(), &cx, &mut new, &old).unwrap();
    }
}
