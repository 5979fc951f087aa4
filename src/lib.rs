//! statehub: a typed object store with watch semantics.
//!
//! Records enter through the [`Client`] facade, get dispatched by the
//! [`Router`] to a per-type [`TypedStore`], pass the admission chain, and
//! every commit fans out through the per-type event hub to watch subscribers.

#![forbid(unsafe_code)]

pub mod admission;
pub mod api;
pub mod client;
pub mod context;
pub mod error;
pub mod hub;
pub mod limits;
pub mod router;
pub mod schema;
pub mod store;
pub mod telemetry;
pub mod validate;

pub use error::{BadRequest, Effect, Error, ErrorCode, FieldViolation, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the working surface at the crate root.
pub use crate::admission::{AdmissionChain, AdmissionHook, GenericDefaulter, GenericValidator};
pub use crate::api::{
    DeleteAllOfOptions, EventKind, ListOptions, NamespacedName, Object, ObjectMeta,
    OwnerReference, ResourceEvent, Selector, StreamStatus, WatchOptions,
};
pub use crate::client::{Cache, Client};
pub use crate::context::{CancelGuard, Context};
pub use crate::hub::WatchHandle;
pub use crate::limits::Limits;
pub use crate::router::{Router, RouterBuilder};
pub use crate::schema::{Schema, Scope, TypeDescriptor};
pub use crate::store::{Backend, MemoryBackend, TypedStore};
