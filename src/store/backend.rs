//! Persistence seam for a per-type table.

use bytes::Bytes;

/// Byte-level storage for one typed table plus its commit sequence.
///
/// The canonical implementation is [`MemoryBackend`](super::MemoryBackend);
/// disk-backed implementations must provide single-writer semantics under
/// their own lock. The store serializes all calls behind its table lock, so a
/// backend never sees concurrent mutations for one type.
pub trait Backend: Send + Sync + 'static {
    fn load(&self, key: &str) -> Option<Bytes>;

    fn store(&mut self, key: &str, value: Bytes);

    fn delete(&mut self, key: &str);

    /// All entries whose key starts with `prefix`, in key order.
    fn iterate(&self, prefix: &str) -> Vec<(String, Bytes)>;

    /// Increment and return the per-type commit sequence.
    fn next_sequence(&mut self) -> u64;

    /// Current value of the commit sequence.
    fn sequence(&self) -> u64;
}
