//! Client facade and the watch-fed read cache.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::api::{
    DeleteAllOfOptions, ListOptions, NamespacedName, Object, ResourceEvent, WatchOptions,
};
use crate::context::Context;
use crate::error::Error;
use crate::hub::WatchHandle;
use crate::router::Router;

/// Uniform read/write/watch surface over the router.
///
/// Thin by design: option application and namespace gating happen below; this
/// is the handle higher layers hold.
#[derive(Clone)]
pub struct Client {
    router: Arc<Router>,
}

impl Client {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn get<T: Object>(&self, cx: &Context, key: &NamespacedName) -> Result<T, Error> {
        self.router.get(cx, key)
    }

    pub fn list<T: Object>(&self, cx: &Context, options: &ListOptions) -> Result<Vec<T>, Error> {
        self.router.list(cx, options)
    }

    pub fn watch<T: Object>(
        &self,
        cx: &Context,
        options: WatchOptions,
    ) -> Result<WatchHandle<T>, Error> {
        self.router.watch(cx, options)
    }

    pub fn create<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        self.router.create(cx, obj)
    }

    pub fn update<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        self.router.update(cx, obj)
    }

    pub fn update_status<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        self.router.update_status(cx, obj)
    }

    pub fn delete<T: Object>(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        self.router.delete(cx, obj)
    }

    pub fn delete_all_of<T: Object>(
        &self,
        cx: &Context,
        options: &DeleteAllOfOptions,
    ) -> Result<(), Error> {
        self.router.delete_all_of::<T>(cx, options)
    }
}

/// Read-through mirror of one type, kept current by a watch.
///
/// `run` blocks feeding the cache until the context is canceled; reads answer
/// from the mirror without touching the store. When the stream drops (the
/// feeding watcher lagged or the hub restarted) the cache reseeds itself with
/// a fresh watch, whose snapshot seeding doubles as the relist.
pub struct Cache<T: Object> {
    objects: RwLock<BTreeMap<String, T>>,
}

impl<T: Object> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Object> Cache<T> {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, key: &NamespacedName) -> Result<T, Error> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("cache lock poisoned"))?;
        objects.get(&key.key()).cloned().ok_or_else(|| Error::NotFound {
            type_name: T::type_name().to_string(),
            key: key.key(),
        })
    }

    pub fn list(&self, options: &ListOptions) -> Result<Vec<T>, Error> {
        let objects = self
            .objects
            .read()
            .map_err(|_| Error::internal("cache lock poisoned"))?;
        let out = objects
            .values()
            .filter(|obj| match &options.namespace {
                Some(namespace) => obj.meta().namespace == *namespace,
                None => true,
            })
            .filter(|obj| options.selector.matches(&obj.meta().labels))
            .cloned()
            .collect();
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feed the cache until `cx` is canceled.
    pub fn run(&self, cx: &Context, client: &Client, options: ListOptions) -> Result<(), Error> {
        loop {
            if cx.is_canceled() {
                return Ok(());
            }

            let watch = client.watch::<T>(
                cx,
                WatchOptions {
                    list: options.clone(),
                    resume_from: None,
                },
            )?;
            self.replace_all(BTreeMap::new())?;
            debug!(kind = T::type_name(), "cache watch established");

            loop {
                crossbeam::select! {
                    recv(watch.events()) -> msg => match msg {
                        Ok(ResourceEvent::Added(obj)) | Ok(ResourceEvent::Modified(obj)) => {
                            self.upsert(obj)?;
                        }
                        Ok(ResourceEvent::Deleted(obj)) => {
                            self.remove(&NamespacedName::of_meta(obj.meta()))?;
                        }
                        Ok(ResourceEvent::Error(status)) => {
                            warn!(kind = T::type_name(), %status, "cache stream error, reseeding");
                            break;
                        }
                        Err(_) => {
                            warn!(kind = T::type_name(), "cache stream closed, reseeding");
                            break;
                        }
                    },
                    recv(cx.done()) -> _ => {
                        watch.close();
                        return Ok(());
                    }
                }
            }
        }
    }

    fn upsert(&self, obj: T) -> Result<(), Error> {
        let key = NamespacedName::of_meta(obj.meta()).key();
        self.objects
            .write()
            .map_err(|_| Error::internal("cache lock poisoned"))?
            .insert(key, obj);
        Ok(())
    }

    fn remove(&self, key: &NamespacedName) -> Result<(), Error> {
        self.objects
            .write()
            .map_err(|_| Error::internal("cache lock poisoned"))?
            .remove(&key.key());
        Ok(())
    }

    fn replace_all(&self, objects: BTreeMap<String, T>) -> Result<(), Error> {
        *self
            .objects
            .write()
            .map_err(|_| Error::internal("cache lock poisoned"))? = objects;
        Ok(())
    }
}
