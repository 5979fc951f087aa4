//! In-memory backend, the canonical one.

use std::collections::BTreeMap;
use std::ops::Bound;

use bytes::Bytes;

use crate::store::Backend;

/// Ordered map of encoded records plus the per-type sequence.
#[derive(Default)]
pub struct MemoryBackend {
    data: BTreeMap<String, Bytes>,
    sequence: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Backend for MemoryBackend {
    fn load(&self, key: &str) -> Option<Bytes> {
        self.data.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: Bytes) {
        self.data.insert(key.to_string(), value);
    }

    fn delete(&mut self, key: &str) {
        self.data.remove(key);
    }

    fn iterate(&self, prefix: &str) -> Vec<(String, Bytes)> {
        let range = self
            .data
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded));
        range
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterate_honors_the_prefix() {
        let mut backend = MemoryBackend::new();
        backend.store("prod/a", Bytes::from_static(b"1"));
        backend.store("prod/b", Bytes::from_static(b"2"));
        backend.store("staging/a", Bytes::from_static(b"3"));
        backend.store("/global", Bytes::from_static(b"4"));

        let keys: Vec<String> = backend
            .iterate("prod/")
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["prod/a", "prod/b"]);

        let global: Vec<String> = backend
            .iterate("/")
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(global, vec!["/global"]);

        assert_eq!(backend.iterate("").len(), 4);
    }

    #[test]
    fn sequence_increments_on_demand_only() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.sequence(), 0);
        assert_eq!(backend.next_sequence(), 1);
        assert_eq!(backend.next_sequence(), 2);
        assert_eq!(backend.sequence(), 2);
    }

    #[test]
    fn delete_removes_the_entry() {
        let mut backend = MemoryBackend::new();
        backend.store("prod/a", Bytes::from_static(b"1"));
        backend.delete("prod/a");
        assert!(backend.load("prod/a").is_none());
        assert!(backend.is_empty());
    }
}
