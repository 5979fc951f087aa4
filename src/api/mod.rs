//! Object model: metadata, the storable-object capability, events, options.

pub mod event;
pub mod meta;
pub mod object;
pub mod options;

pub use event::{EventKind, ResourceEvent, StreamStatus};
pub use meta::{NamespacedName, ObjectMeta, OwnerReference};
pub use object::Object;
pub use options::{DeleteAllOfOptions, ListOptions, Selector, WatchOptions};
