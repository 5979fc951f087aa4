//! Normative sizing defaults.

use serde::{Deserialize, Serialize};

/// Knobs shared by the store, hub and validators.
///
/// Every component takes its sizes from here rather than scattering literals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Slots in the per-type replay ring buffer.
    pub event_ring_capacity: usize,
    /// Bounded queue capacity per watch subscriber (seed and live).
    pub subscriber_queue_capacity: usize,
    /// Longest accepted label value.
    pub max_label_value_len: usize,
    /// Longest accepted annotation value, in bytes.
    pub max_annotation_value_bytes: usize,
    /// Random suffix length appended to `generate_name` prefixes.
    pub generate_name_suffix_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            event_ring_capacity: 100,
            subscriber_queue_capacity: 50,
            max_label_value_len: 63,
            max_annotation_value_bytes: 1024,
            generate_name_suffix_len: 4,
        }
    }
}
