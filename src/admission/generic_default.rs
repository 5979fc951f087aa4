//! Generic defaulting hook.

use rand::Rng;

use crate::admission::AdmissionHook;
use crate::api::Object;
use crate::context::Context;
use crate::error::Error;
use crate::limits::Limits;

const SUFFIX_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub(crate) fn generate_name_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let i = rng.random_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET[i] as char
        })
        .collect()
}

/// Resolves `generate_name` into a concrete `name` on create, then gives the
/// record a chance to fill its own defaults on every mutation.
pub struct GenericDefaulter {
    suffix_len: usize,
}

impl GenericDefaulter {
    pub fn new(limits: &Limits) -> Self {
        Self {
            suffix_len: limits.generate_name_suffix_len,
        }
    }
}

impl<T: Object> AdmissionHook<T> for GenericDefaulter {
    fn on_create(&self, cx: &Context, obj: &mut T) -> Result<(), Error> {
        let meta = obj.meta_mut();
        if meta.name.is_empty() && !meta.generate_name.is_empty() {
            meta.name = format!(
                "{}{}",
                meta.generate_name,
                generate_name_suffix(self.suffix_len)
            );
        }
        obj.default_fields(cx)
    }

    fn on_update(&self, cx: &Context, obj: &mut T, _old: &T) -> Result<(), Error> {
        obj.default_fields(cx)
    }
}
