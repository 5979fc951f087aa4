//! Type descriptors: qualified names, list naming, namespaced/global scope.

use std::collections::BTreeMap;

use crate::api::Object;

/// Whether records of a type live inside a namespace or globally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Global,
    Namespaced,
}

impl Scope {
    pub fn is_namespaced(self) -> bool {
        matches!(self, Scope::Namespaced)
    }
}

/// Everything the dispatch layer knows about one registered type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    name: &'static str,
    list_name: String,
    scope: Scope,
}

impl TypeDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Presentation name for the corresponding list type.
    pub fn list_name(&self) -> &str {
        &self.list_name
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }
}

/// Registry of known record types.
///
/// The store itself is statically typed; the schema answers the dynamic
/// questions left over: is this qualified name known, is it namespaced, and
/// what is its list type called.
#[derive(Debug, Default)]
pub struct Schema {
    types: BTreeMap<&'static str, TypeDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Object>(&mut self, scope: Scope) {
        let name = T::type_name();
        self.types.insert(
            name,
            TypeDescriptor {
                name,
                list_name: format!("{name}List"),
                scope,
            },
        );
    }

    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn descriptor_of<T: Object>(&self) -> Option<&TypeDescriptor> {
        self.descriptor(T::type_name())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn is_namespaced(&self, name: &str) -> Option<bool> {
        self.descriptor(name)
            .map(|descriptor| descriptor.scope.is_namespaced())
    }

    /// Registered types in name order.
    pub fn known_types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
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
            "example.dev.Doc"
        }
        fn meta(&self) -> &ObjectMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.meta
        }
    }

    #[test]
    fn registration_derives_the_list_name() {
        let mut schema = Schema::new();
        schema.register::<Doc>(Scope::Namespaced);

        let descriptor = schema.descriptor_of::<Doc>().unwrap();
        assert_eq!(descriptor.name(), "example.dev.Doc");
        assert_eq!(descriptor.list_name(), "example.dev.DocList");
        assert_eq!(schema.is_namespaced("example.dev.Doc"), Some(true));
        assert!(!schema.contains("example.dev.Other"));
    }
}
