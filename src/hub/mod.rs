//! Per-type event hub: a single owner loop multiplexing commits to watchers.
//!
//! The loop serializes register, deregister, broadcast and shutdown. Commits
//! arrive over a rendezvous channel, so a broadcaster returns only after the
//! hub has taken its event — that is the ordering point between "committed"
//! and "observable". Watchers get a bounded queue each; one that stops
//! draining is closed and evicted rather than ever stalling a writer.
//!
//! Seeding runs inside the loop, before any later broadcast is accepted. A
//! fresh watch is seeded from a table snapshot, a resuming watch from the
//! replay ring. Each subscriber then carries a delivery floor (the snapshot
//! sequence or the resume version): live events at or below the floor are
//! already covered by the seed and are skipped for that subscriber.

mod ring;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use tracing::{debug, warn};

use crate::api::{ListOptions, Object, ResourceEvent};
use crate::context::Context;
use crate::error::Error;
use self::ring::EventRing;

/// Snapshot callback supplied by the store: matching records plus the
/// per-type sequence at snapshot time.
pub(crate) type Lister<T> = Box<dyn Fn(&ListOptions) -> Result<(Vec<T>, u64), Error> + Send>;

struct Registration<T> {
    id: u64,
    resume_from: Option<u64>,
    options: ListOptions,
    queue: Sender<ResourceEvent<T>>,
    init: Sender<Result<(), Error>>,
}

enum Command<T> {
    Broadcast { version: u64, event: ResourceEvent<T> },
    Shutdown,
}

struct SubscriberSlot<T> {
    queue: Sender<ResourceEvent<T>>,
    floor: u64,
}

/// Store-side handle owning the hub thread.
pub(crate) struct HubHandle<T: Object> {
    register_tx: Sender<Registration<T>>,
    command_tx: Sender<Command<T>>,
    deregister_tx: Sender<u64>,
    next_id: AtomicU64,
    thread: Option<JoinHandle<()>>,
}

impl<T: Object> HubHandle<T> {
    pub fn spawn(lister: Lister<T>, ring_capacity: usize) -> Self {
        let (register_tx, register_rx) = bounded(0);
        let (command_tx, command_rx) = bounded(0);
        let (deregister_tx, deregister_rx) = unbounded();

        let thread = std::thread::spawn(move || {
            run_loop(register_rx, command_rx, deregister_rx, lister, ring_capacity);
        });

        Self {
            register_tx,
            command_tx,
            deregister_tx,
            next_id: AtomicU64::new(1),
            thread: Some(thread),
        }
    }

    pub fn register(
        &self,
        cx: &Context,
        resume_from: Option<u64>,
        options: ListOptions,
        queue_capacity: usize,
    ) -> Result<WatchHandle<T>, Error> {
        cx.check()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (queue_tx, queue_rx) = bounded(queue_capacity);
        let (init_tx, init_rx) = bounded(1);
        let registration = Registration {
            id,
            resume_from,
            options,
            queue: queue_tx,
            init: init_tx,
        };

        crossbeam::select! {
            send(self.register_tx, registration) -> res => {
                if res.is_err() {
                    return Err(Error::internal("event hub stopped"));
                }
            }
            recv(cx.done()) -> _ => return Err(Error::Canceled),
        }

        let init = crossbeam::select! {
            recv(init_rx) -> res => {
                res.map_err(|_| Error::internal("event hub dropped the registration"))?
            }
            recv(cx.done()) -> _ => return Err(Error::Canceled),
        };
        init?;

        Ok(WatchHandle {
            id,
            events: queue_rx,
            deregister: self.deregister_tx.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Hand one committed event to the hub. Returns once the hub has taken it.
    pub fn broadcast(&self, version: u64, event: ResourceEvent<T>) {
        if self
            .command_tx
            .send(Command::Broadcast { version, event })
            .is_err()
        {
            warn!(kind = T::type_name(), version, "event hub stopped, dropping event");
        }
    }
}

impl<T: Object> Drop for HubHandle<T> {
    fn drop(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// A registered watch: the event stream plus its cancel side.
///
/// `close` may be called from any thread and is idempotent; it is the sole
/// owner of deregistration. The stream ends (the channel disconnects) once
/// the hub has processed the deregistration. Dropping the handle closes it.
#[derive(Debug)]
pub struct WatchHandle<T: Object> {
    id: u64,
    events: Receiver<ResourceEvent<T>>,
    deregister: Sender<u64>,
    closed: AtomicBool,
}

impl<T: Object> WatchHandle<T> {
    pub fn events(&self) -> &Receiver<ResourceEvent<T>> {
        &self.events
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.deregister.send(self.id);
    }
}

impl<T: Object> Drop for WatchHandle<T> {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_loop<T: Object>(
    register_rx: Receiver<Registration<T>>,
    command_rx: Receiver<Command<T>>,
    deregister_rx: Receiver<u64>,
    lister: Lister<T>,
    ring_capacity: usize,
) {
    let mut ring: EventRing<ResourceEvent<T>> = EventRing::new(ring_capacity);
    let mut subscribers: BTreeMap<u64, SubscriberSlot<T>> = BTreeMap::new();

    loop {
        crossbeam::select! {
            recv(register_rx) -> msg => match msg {
                Ok(registration) => seed(&mut subscribers, &ring, &lister, registration),
                Err(_) => break,
            },
            recv(deregister_rx) -> msg => match msg {
                Ok(id) => {
                    subscribers.remove(&id);
                }
                Err(_) => break,
            },
            recv(command_rx) -> msg => match msg {
                Ok(Command::Broadcast { version, event }) => {
                    ring.append(version, event.clone());
                    deliver(&mut subscribers, version, &event);
                }
                Ok(Command::Shutdown) | Err(_) => break,
            },
        }
    }
    // Dropping the subscriber map closes every queue.
}

fn seed<T: Object>(
    subscribers: &mut BTreeMap<u64, SubscriberSlot<T>>,
    ring: &EventRing<ResourceEvent<T>>,
    lister: &Lister<T>,
    registration: Registration<T>,
) {
    let (events, floor) = match registration.resume_from {
        Some(version) => match ring.from_index(version) {
            Some(tail) => (tail, version),
            None => {
                let _ = registration.init.send(Err(Error::Expired {
                    message: "requested resource version is no longer available".into(),
                }));
                return;
            }
        },
        None => match (lister)(&registration.options) {
            Ok((objects, sequence)) => {
                let added = objects.into_iter().map(ResourceEvent::Added).collect();
                (added, sequence)
            }
            Err(err) => {
                let _ = registration.init.send(Err(err));
                return;
            }
        },
    };

    // Errors are reported before any delivery; from here the watch is live.
    let _ = registration.init.send(Ok(()));
    debug!(
        kind = T::type_name(),
        subscriber = registration.id,
        floor,
        seed = events.len(),
        "watch registered"
    );

    let slot = SubscriberSlot {
        queue: registration.queue,
        floor,
    };
    for event in events {
        if slot.queue.send(event).is_err() {
            // Receiver dropped mid-seed; never becomes a subscriber.
            return;
        }
    }
    subscribers.insert(registration.id, slot);
}

fn deliver<T: Object>(
    subscribers: &mut BTreeMap<u64, SubscriberSlot<T>>,
    version: u64,
    event: &ResourceEvent<T>,
) {
    let mut evicted = Vec::new();
    for (id, slot) in subscribers.iter() {
        if version <= slot.floor {
            continue;
        }
        match slot.queue.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = id, version, "watch subscriber lagging, closing");
                evicted.push(*id);
            }
            Err(TrySendError::Disconnected(_)) => {
                evicted.push(*id);
            }
        }
    }
    for id in evicted {
        subscribers.remove(&id);
    }
}
