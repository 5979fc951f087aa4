//! Backend seam, record codec and the per-type store engine.

mod backend;
mod memory;
mod typed;

pub use backend::Backend;
pub use memory::MemoryBackend;
pub use typed::TypedStore;

use bytes::Bytes;

use crate::api::{ListOptions, Object};
use crate::error::Error;

/// Canonical record encoding. Byte equality of encodings is the no-op test
/// for updates, so the encoding must be deterministic (ordered maps, fixed
/// field order).
pub(crate) fn encode<T: serde::Serialize>(obj: &T) -> Result<Bytes, Error> {
    serde_json::to_vec(obj)
        .map(Bytes::from)
        .map_err(|err| Error::internal(format!("encoding record: {err}")))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|err| Error::internal(format!("decoding record: {err}")))
}

/// Decode every record under the namespace prefix and keep selector matches.
pub(crate) fn collect<T: Object>(
    backend: &dyn Backend,
    options: &ListOptions,
) -> Result<Vec<T>, Error> {
    let mut out = Vec::new();
    for (_, bytes) in backend.iterate(&options.key_prefix()) {
        let obj: T = decode(&bytes)?;
        if options.selector.matches(&obj.meta().labels) {
            out.push(obj);
        }
    }
    Ok(out)
}
