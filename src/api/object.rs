//! The object capability: what a type must provide to be stored.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::ObjectMeta;
use crate::context::Context;
use crate::error::Error;

/// A storable record type.
///
/// A record is metadata plus a typed spec (user intent) and an optional status
/// (observed state). The store only ever touches metadata and, through
/// [`Object::set_status_from`], the status; spec fields are opaque to it.
///
/// The validation and defaulting methods are optional capabilities with no-op
/// defaults; the generic admission hooks call them around every mutation.
pub trait Object:
    Clone + Debug + Default + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Dotted qualified type name, unique within a schema.
    fn type_name() -> &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Overwrite this record's status with `other`'s.
    ///
    /// Types without a status field keep the default no-op, which makes
    /// `UpdateStatus` a pure resource-version bump for them.
    fn set_status_from(&mut self, other: &Self) {
        let _ = other;
    }

    /// Fill unset spec fields with their defaults. Runs inside admission on
    /// every mutation, after `generate_name` resolution.
    fn default_fields(&mut self, cx: &Context) -> Result<(), Error> {
        let _ = cx;
        Ok(())
    }

    /// Type-specific create validation. Return [`Error::BadRequest`] to have
    /// the violations merged with metadata violations; any other error aborts
    /// the operation verbatim.
    fn validate_create(&self, cx: &Context) -> Result<(), Error> {
        let _ = cx;
        Ok(())
    }

    /// Type-specific update validation against the currently stored record.
    fn validate_update(&self, cx: &Context, old: &Self) -> Result<(), Error> {
        let _ = (cx, old);
        Ok(())
    }

    /// Type-specific delete validation.
    fn validate_delete(&self, cx: &Context) -> Result<(), Error> {
        let _ = cx;
        Ok(())
    }
}
