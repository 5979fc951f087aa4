//! Namespace-aware dispatch across per-type stores.
//!
//! One registered type is the namespace type. Every operation is gated on the
//! target namespace before it reaches the per-type store: namespaced types
//! must name an existing namespace, the namespace type itself must stay
//! global, and creates into a terminating namespace are refused.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::{
    DeleteAllOfOptions, ListOptions, NamespacedName, Object, WatchOptions,
};
use crate::context::Context;
use crate::error::{BadRequest, Error};
use crate::hub::WatchHandle;
use crate::limits::Limits;
use crate::schema::{Schema, Scope};
use crate::store::TypedStore;
use crate::validate::NOT_EMPTY;

struct NamespaceRecord {
    terminating: bool,
}

type NamespaceProbe = Box<dyn Fn(&Context, &str) -> Result<NamespaceRecord, Error> + Send + Sync>;

/// Immutable registry of per-type stores behind the namespace gates.
///
/// Store lookups after construction are plain map reads; only the namespace
/// probe touches a store (the namespace type's own).
pub struct Router {
    schema: Schema,
    namespace_type: &'static str,
    stores: BTreeMap<&'static str, Box<dyn Any + Send + Sync>>,
    namespace_probe: NamespaceProbe,
}

impl Router {
    /// Start building a router around namespace type `N`.
    pub fn builder<N: Object>(limits: Limits) -> RouterBuilder<N> {
        let namespace_store = Arc::new(TypedStore::<N>::new(Scope::Global, limits.clone()));
        RouterBuilder::from_namespace_store(limits, namespace_store)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The registered store for `T`.
    pub fn store<T: Object>(&self) -> Result<&Arc<TypedStore<T>>, Error> {
        let entry = self.stores.get(T::type_name()).ok_or_else(|| {
            Error::from(BadRequest::single(
                ".type",
                format!("no store registered for type {}", T::type_name()),
            ))
        })?;
        entry
            .downcast_ref::<Arc<TypedStore<T>>>()
            .ok_or_else(|| Error::internal("store registry holds a mismatched type"))
    }

    pub fn get<T: Object>(&self, cx: &Context, key: &NamespacedName) -> Result<T, Error> {
        let store = self.store::<T>()?;
        self.gate_target::<T>(cx, &key.namespace, false)?;
        store.get(cx, key)
    }

    pub fn list<T: Object>(&self, cx: &Context, options: &ListOptions) -> Result<Vec<T>, Error> {
        let store = self.store::<T>()?;
        self.gate_filter(cx, options.namespace.as_deref())?;
        store.list(cx, options)
    }

    pub fn watch<T: Object>(
        &self,
        cx: &Context,
        options: WatchOptions,
    ) -> Result<WatchHandle<T>, Error> {
        let store = self.store::<T>()?;
        self.gate_filter(cx, options.list.namespace.as_deref())?;
        store.watch(cx, options)
    }

    pub fn create<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let store = self.store::<T>()?;
        self.gate_target::<T>(cx, &obj.meta().namespace, true)?;
        store.create(cx, obj)
    }

    pub fn update<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let store = self.store::<T>()?;
        self.gate_target::<T>(cx, &obj.meta().namespace, false)?;
        store.update(cx, obj)
    }

    pub fn update_status<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let store = self.store::<T>()?;
        self.gate_target::<T>(cx, &obj.meta().namespace, false)?;
        store.update_status(cx, obj)
    }

    pub fn delete<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let store = self.store::<T>()?;
        self.gate_target::<T>(cx, &obj.meta().namespace, false)?;
        store.delete(cx, obj)
    }

    pub fn delete_all_of<T: Object>(
        &self,
        cx: &Context,
        options: &DeleteAllOfOptions,
    ) -> Result<(), Error> {
        let store = self.store::<T>()?;
        self.gate_filter(cx, options.list.namespace.as_deref())?;
        store.delete_all_of(cx, options)
    }

    /// Gate for operations addressing one record.
    fn gate_target<T: Object>(&self, cx: &Context, namespace: &str, create: bool) -> Result<(), Error> {
        if T::type_name() == self.namespace_type {
            if !namespace.is_empty() {
                return Err(BadRequest::single(
                    ".meta.namespace",
                    "namespace records cannot themselves be namespaced",
                )
                .into());
            }
            return Ok(());
        }

        if namespace.is_empty() {
            if self.schema.is_namespaced(T::type_name()).unwrap_or(false) {
                return Err(BadRequest::single(".meta.namespace", NOT_EMPTY).into());
            }
            return Ok(());
        }

        let record = (self.namespace_probe)(cx, namespace)?;
        if create && record.terminating {
            return Err(BadRequest::single(
                ".meta.namespace",
                "namespace is terminating, creating records is forbidden",
            )
            .into());
        }
        Ok(())
    }

    /// Gate for list-shaped operations: an absent namespace means "all", a
    /// present one must exist.
    fn gate_filter(&self, cx: &Context, namespace: Option<&str>) -> Result<(), Error> {
        match namespace {
            None | Some("") => Ok(()),
            Some(namespace) => {
                (self.namespace_probe)(cx, namespace)?;
                Ok(())
            }
        }
    }
}

/// Builder: registers types and their stores, then seals the router.
pub struct RouterBuilder<N: Object> {
    limits: Limits,
    schema: Schema,
    stores: BTreeMap<&'static str, Box<dyn Any + Send + Sync>>,
    namespace_store: Arc<TypedStore<N>>,
}

impl<N: Object> RouterBuilder<N> {
    /// Build around an existing namespace store (custom backend or hooks).
    pub fn from_namespace_store(limits: Limits, namespace_store: Arc<TypedStore<N>>) -> Self {
        let mut schema = Schema::new();
        schema.register::<N>(Scope::Global);
        let mut stores: BTreeMap<&'static str, Box<dyn Any + Send + Sync>> = BTreeMap::new();
        stores.insert(
            N::type_name(),
            Box::new(Arc::clone(&namespace_store)) as Box<dyn Any + Send + Sync>,
        );
        Self {
            limits,
            schema,
            stores,
            namespace_store,
        }
    }

    /// Register `T` with a fresh in-memory store.
    pub fn register<T: Object>(self, scope: Scope) -> Self {
        let store = Arc::new(TypedStore::<T>::new(scope, self.limits.clone()));
        self.register_store::<T>(store)
    }

    /// Register `T` with a pre-built store (custom backend or hooks).
    pub fn register_store<T: Object>(mut self, store: Arc<TypedStore<T>>) -> Self {
        let scope = if store.is_namespaced() {
            Scope::Namespaced
        } else {
            Scope::Global
        };
        self.schema.register::<T>(scope);
        self.stores
            .insert(T::type_name(), Box::new(store) as Box<dyn Any + Send + Sync>);
        self
    }

    pub fn build(self) -> Router {
        let namespace_store = self.namespace_store;
        let namespace_probe: NamespaceProbe = Box::new(move |cx, name| {
            let record = namespace_store.get(cx, &NamespacedName::global(name))?;
            Ok(NamespaceRecord {
                terminating: record.meta().is_terminating(),
            })
        });
        Router {
            schema: self.schema,
            namespace_type: N::type_name(),
            stores: self.stores,
            namespace_probe,
        }
    }
}
