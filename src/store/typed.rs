//! The state machine guarding a single typed table.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::admission::{AdmissionChain, AdmissionHook, generate_name_suffix};
use crate::api::{
    DeleteAllOfOptions, ListOptions, NamespacedName, Object, ResourceEvent, WatchOptions,
};
use crate::context::Context;
use crate::error::{BadRequest, Error};
use crate::hub::{HubHandle, Lister, WatchHandle};
use crate::limits::Limits;
use crate::schema::Scope;
use crate::store::{Backend, MemoryBackend, collect, decode, encode};
use crate::validate;

type Table = Arc<RwLock<Box<dyn Backend>>>;

/// Transactional engine for one record type.
///
/// A reader/writer lock serializes access to the table and its sequence; the
/// event hub runs on its own thread and is fed through a rendezvous channel.
/// A writer hands its event to the hub *after* releasing the table lock but
/// while holding a dedicated broadcast gate, which keeps broadcasts in commit
/// order without ever blocking the hub's seeding against the table lock.
pub struct TypedStore<T: Object> {
    table: Table,
    broadcast_gate: Mutex<()>,
    hub: HubHandle<T>,
    admission: AdmissionChain<T>,
    limits: Limits,
    namespaced: bool,
}

impl<T: Object> TypedStore<T> {
    pub fn new(scope: Scope, limits: Limits) -> Self {
        Self::with_backend(scope, limits, Box::new(MemoryBackend::new()))
    }

    pub fn with_backend(scope: Scope, limits: Limits, backend: Box<dyn Backend>) -> Self {
        let table: Table = Arc::new(RwLock::new(backend));
        let lister_table = Arc::clone(&table);
        let lister: Lister<T> = Box::new(move |options| {
            let guard = lister_table
                .read()
                .map_err(|_| Error::internal("store table lock poisoned"))?;
            let objects = collect::<T>(guard.as_ref(), options)?;
            Ok((objects, guard.sequence()))
        });
        let hub = HubHandle::spawn(lister, limits.event_ring_capacity);
        let namespaced = matches!(scope, Scope::Namespaced);

        Self {
            table,
            broadcast_gate: Mutex::new(()),
            hub,
            admission: AdmissionChain::standard(namespaced, &limits),
            limits,
            namespaced,
        }
    }

    /// Append a per-type admission hook after the generic pair.
    pub fn with_hook(mut self, hook: Box<dyn AdmissionHook<T>>) -> Self {
        self.admission.push(hook);
        self
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn get(&self, cx: &Context, key: &NamespacedName) -> Result<T, Error> {
        cx.check()?;
        let violations = validate::validate_namespaced_name(key);
        if !violations.is_empty() {
            return Err(BadRequest::new(violations).into());
        }
        let table = self.read_table()?;
        let bytes = table.load(&key.key()).ok_or_else(|| self.not_found(key))?;
        decode(&bytes)
    }

    pub fn list(&self, cx: &Context, options: &ListOptions) -> Result<Vec<T>, Error> {
        cx.check()?;
        let table = self.read_table()?;
        collect::<T>(table.as_ref(), options)
    }

    pub fn watch(&self, cx: &Context, options: WatchOptions) -> Result<WatchHandle<T>, Error> {
        cx.check()?;
        let resume_from = match options.resume_from.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::from(BadRequest::single(
                    "resumeFrom",
                    "must be a decimal resource version",
                ))
            })?),
        };
        self.hub.register(
            cx,
            resume_from,
            options.list,
            self.limits.subscriber_queue_capacity,
        )
    }

    pub fn create(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        cx.check()?;
        let generated = obj.meta().name.is_empty() && !obj.meta().generate_name.is_empty();
        self.admission.admit_create(cx, obj)?;

        let mut table = self.write_table()?;
        loop {
            let key = NamespacedName::of_meta(obj.meta()).key();
            if table.load(&key).is_none() {
                break;
            }
            if !generated {
                return Err(Error::AlreadyExists {
                    type_name: T::type_name().to_string(),
                    key,
                });
            }
            // Regenerate the random suffix until the key is free.
            let meta = obj.meta_mut();
            meta.name = format!(
                "{}{}",
                meta.generate_name,
                generate_name_suffix(self.limits.generate_name_suffix_len)
            );
        }

        cx.check()?;
        let sequence = table.next_sequence();
        {
            let meta = obj.meta_mut();
            meta.generation = 1;
            meta.resource_version = sequence.to_string();
            meta.uid = Uuid::new_v4().to_string();
            meta.created_timestamp = Some(OffsetDateTime::now_utc());
        }
        let key = NamespacedName::of_meta(obj.meta()).key();
        let bytes = encode(obj)?;
        table.store(&key, bytes);
        debug!(kind = T::type_name(), key, sequence, "record created");
        self.commit_broadcast(table, sequence, ResourceEvent::Added(obj.clone()))
    }

    pub fn update(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        cx.check()?;
        let key = self.valid_key(obj)?;
        let mut table = self.write_table()?;
        let existing_bytes = table.load(&key.key()).ok_or_else(|| self.not_found(&key))?;
        let existing: T = decode(&existing_bytes)?;
        self.admission.admit_update(cx, obj, &existing)?;

        if existing.meta().is_terminating() && obj.meta().finalizers.is_empty() {
            // Last finalizer removed: this commit is the physical removal.
            cx.check()?;
            let sequence = table.next_sequence();
            obj.set_status_from(&existing);
            let uid = existing.meta().uid.clone();
            {
                let meta = obj.meta_mut();
                meta.resource_version = sequence.to_string();
                meta.uid = uid;
            }
            table.delete(&key.key());
            debug!(
                kind = T::type_name(),
                key = key.key(),
                sequence,
                "record removed after final finalizer"
            );
            return self.commit_broadcast(table, sequence, ResourceEvent::Deleted(obj.clone()));
        }

        // Status moves only through UpdateStatus.
        obj.set_status_from(&existing);
        let candidate = encode(obj)?;
        if candidate == existing_bytes {
            return Ok(());
        }
        if obj.meta().resource_version != existing.meta().resource_version {
            return Err(Error::Conflict {
                type_name: T::type_name().to_string(),
                key: key.key(),
            });
        }

        cx.check()?;
        let sequence = table.next_sequence();
        let generation = existing.meta().generation + 1;
        let uid = existing.meta().uid.clone();
        {
            let meta = obj.meta_mut();
            meta.generation = generation;
            meta.resource_version = sequence.to_string();
            meta.uid = uid;
        }
        let bytes = encode(obj)?;
        table.store(&key.key(), bytes);
        debug!(
            kind = T::type_name(),
            key = key.key(),
            sequence,
            generation,
            "record updated"
        );
        self.commit_broadcast(table, sequence, ResourceEvent::Modified(obj.clone()))
    }

    pub fn update_status(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        cx.check()?;
        let key = self.valid_key(obj)?;
        let mut table = self.write_table()?;
        let existing_bytes = table.load(&key.key()).ok_or_else(|| self.not_found(&key))?;
        let existing: T = decode(&existing_bytes)?;
        self.admission.admit_update(cx, obj, &existing)?;

        // Metadata and spec come from the stored record; only status moves.
        let mut updated = existing.clone();
        updated.set_status_from(obj);
        let candidate = encode(&updated)?;
        if candidate == existing_bytes {
            *obj = updated;
            return Ok(());
        }

        cx.check()?;
        let sequence = table.next_sequence();
        updated.meta_mut().resource_version = sequence.to_string();
        let bytes = encode(&updated)?;
        table.store(&key.key(), bytes);
        *obj = updated;
        debug!(
            kind = T::type_name(),
            key = key.key(),
            sequence,
            "record status updated"
        );
        self.commit_broadcast(table, sequence, ResourceEvent::Modified(obj.clone()))
    }

    pub fn delete(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        cx.check()?;
        self.admission.admit_delete(cx, obj)?;
        let key = self.valid_key(obj)?;
        let mut table = self.write_table()?;
        let existing_bytes = table.load(&key.key()).ok_or_else(|| self.not_found(&key))?;
        let existing: T = decode(&existing_bytes)?;

        if !existing.meta().finalizers.is_empty() {
            if existing.meta().is_terminating() {
                // Repeated delete while finalizers drain: report state, no event.
                *obj = existing;
                return Ok(());
            }
            cx.check()?;
            let sequence = table.next_sequence();
            let mut updated = existing;
            {
                let meta = updated.meta_mut();
                meta.deleted_timestamp = Some(OffsetDateTime::now_utc());
                meta.generation += 1;
                meta.resource_version = sequence.to_string();
            }
            let bytes = encode(&updated)?;
            table.store(&key.key(), bytes);
            *obj = updated;
            debug!(
                kind = T::type_name(),
                key = key.key(),
                sequence,
                "record terminating, awaiting finalizers"
            );
            return self.commit_broadcast(table, sequence, ResourceEvent::Modified(obj.clone()));
        }

        cx.check()?;
        let sequence = table.next_sequence();
        table.delete(&key.key());
        let mut removed = existing;
        removed.meta_mut().resource_version = sequence.to_string();
        *obj = removed;
        debug!(kind = T::type_name(), key = key.key(), sequence, "record deleted");
        self.commit_broadcast(table, sequence, ResourceEvent::Deleted(obj.clone()))
    }

    /// Best effort: the first failing record stops the loop and returns.
    pub fn delete_all_of(&self, cx: &Context, options: &DeleteAllOfOptions) -> Result<(), Error> {
        cx.check()?;
        let matching = {
            let table = self.write_table()?;
            collect::<T>(table.as_ref(), &options.list)?
        };
        for mut obj in matching {
            self.delete(cx, &mut obj)?;
        }
        Ok(())
    }

    fn read_table(&self) -> Result<RwLockReadGuard<'_, Box<dyn Backend>>, Error> {
        self.table
            .read()
            .map_err(|_| Error::internal("store table lock poisoned"))
    }

    fn write_table(&self) -> Result<RwLockWriteGuard<'_, Box<dyn Backend>>, Error> {
        self.table
            .write()
            .map_err(|_| Error::internal("store table lock poisoned"))
    }

    fn valid_key(&self, obj: &T) -> Result<NamespacedName, Error> {
        let key = NamespacedName::of_meta(obj.meta());
        let violations = validate::validate_namespaced_name(&key);
        if violations.is_empty() {
            Ok(key)
        } else {
            Err(BadRequest::new(violations).into())
        }
    }

    fn not_found(&self, key: &NamespacedName) -> Error {
        Error::NotFound {
            type_name: T::type_name().to_string(),
            key: key.key(),
        }
    }

    /// Publish the commit's event in order.
    ///
    /// The gate is taken while the table lock is still held and released only
    /// after the hub accepted the event, so two commits can never broadcast
    /// out of order; the table lock itself is released first, so the hub's
    /// seeding never deadlocks against a parked writer.
    fn commit_broadcast(
        &self,
        table: RwLockWriteGuard<'_, Box<dyn Backend>>,
        version: u64,
        event: ResourceEvent<T>,
    ) -> Result<(), Error> {
        let gate = self
            .broadcast_gate
            .lock()
            .map_err(|_| Error::internal("broadcast gate poisoned"))?;
        drop(table);
        self.hub.broadcast(version, event);
        drop(gate);
        Ok(())
    }
}
