//! Admission: ordered defaulting and validation hooks around every mutation.

mod generic_default;
mod generic_validation;

pub use generic_default::GenericDefaulter;
pub use generic_validation::GenericValidator;

pub(crate) use generic_default::generate_name_suffix;

use crate::api::Object;
use crate::context::Context;
use crate::error::Error;
use crate::limits::Limits;

/// One admission hook. Hooks inspect (and on create/update, mutate) the
/// submitted record before it is committed; the first error aborts the
/// operation and is returned verbatim.
///
/// The currently stored record is passed to `on_update` — the store has
/// already loaded it for the conflict check, so hooks never re-fetch.
pub trait AdmissionHook<T: Object>: Send + Sync {
    fn on_create(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let _ = (cx, obj);
        Ok(())
    }

    fn on_update(&self, cx: &Context, obj: &mut T, old: &T) -> Result<(), Error> {
        let _ = (cx, obj, old);
        Ok(())
    }

    fn on_delete(&self, cx: &Context, obj: &T) -> Result<(), Error> {
        let _ = (cx, obj);
        Ok(())
    }
}

/// Ordered hook list, executed left to right.
pub struct AdmissionChain<T: Object> {
    hooks: Vec<Box<dyn AdmissionHook<T>>>,
}

impl<T: Object> AdmissionChain<T> {
    /// The mandatory pair: generic defaulter, then generic validator.
    pub fn standard(namespaced: bool, limits: &Limits) -> Self {
        Self {
            hooks: vec![
                Box::new(GenericDefaulter::new(limits)),
                Box::new(GenericValidator::new(namespaced, limits.clone())),
            ],
        }
    }

    /// Append a per-type hook after the generic pair.
    pub fn push(&mut self, hook: Box<dyn AdmissionHook<T>>) {
        self.hooks.push(hook);
    }

    pub(crate) fn admit_create(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        for hook in &self.hooks {
            hook.on_create(cx, obj)?;
        }
        Ok(())
    }

    pub(crate) fn admit_update(&self, cx: &Context, obj: &mut T, old: &T) -> Result<(), Error> {
        for hook in &self.hooks {
            hook.on_update(cx, obj, old)?;
        }
        Ok(())
    }

    pub(crate) fn admit_delete(&self, cx: &Context, obj: &T) -> Result<(), Error> {
        for hook in &self.hooks {
            hook.on_delete(cx, obj)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ObjectMeta;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        meta: ObjectMeta,
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
    }

    struct Reject(&'static str);

    impl AdmissionHook<Doc> for Reject {
        fn on_create(&self, _cx: &Context, _obj: &mut Doc) -> Result<(), Error> {
            Err(Error::internal(self.0))
        }
    }

    struct Tag(&'static str);

    impl AdmissionHook<Doc> for Tag {
        fn on_create(&self, _cx: &Context, obj: &mut Doc) -> Result<(), Error> {
            obj.meta_mut()
                .annotations
                .insert("order".into(), self.0.into());
            Ok(())
        }
    }

    #[test]
    fn first_error_short_circuits() {
        let mut chain = AdmissionChain::<Doc> { hooks: Vec::new() };
        chain.push(Box::new(Reject("first")));
        chain.push(Box::new(Reject("second")));

        let cx = Context::background();
        let mut doc = Doc::default();
        let err = chain.admit_create(&cx, &mut doc).unwrap_err();
        assert!(err.to_string().contains("first"));
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let mut chain = AdmissionChain::<Doc> { hooks: Vec::new() };
        chain.push(Box::new(Tag("one")));
        chain.push(Box::new(Tag("two")));

        let cx = Context::background();
        let mut doc = Doc::default();
        chain.admit_create(&cx, &mut doc).unwrap();
        assert_eq!(doc.meta.annotations.get("order").unwrap(), "two");
    }
}
