//! Identity generation.
//!
//! Every feature, scenario, step, run, project and attachment gets its id from
//! an [`IdGenerator`] owned by the parser or the project store.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh, unique identifiers.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier. Never returns the same value twice.
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs (the runtime default).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` identifiers, counting from 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_generator_uniqueness() {
        let ids = UuidGenerator;
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new("id");
        assert_eq!(ids.next_id(), "id-1");
        assert_eq!(ids.next_id(), "id-2");
        assert_eq!(ids.next_id(), "id-3");
    }
}
