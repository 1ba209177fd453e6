use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::segment::SharedSegment;

static KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a globally unique segment key.
///
/// Keys combine the process id, a process-local counter, and a timestamp so
/// two plugin instances against the same host never collide.
pub fn generate_key() -> String {
    let seq = KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("px-{}-{seq}-{nanos}", std::process::id())
}

/// Tracks the shared segments this process created for the current output
/// batch.
///
/// Owned by the bridge component rather than living in ambient process-wide
/// state; all mutation happens on the single control thread. Guarantees
/// every registered segment is detached and unlinked exactly once — on
/// [`SegmentRegistry::release_all`] before the next batch, or on drop.
#[derive(Debug, Default)]
pub struct SegmentRegistry {
    segments: Vec<SharedSegment>,
}

impl SegmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a segment for release before the next batch.
    pub fn register(&mut self, segment: SharedSegment) {
        self.segments.push(segment);
    }

    /// Number of currently-live tracked segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether no segments are tracked.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Detach and unlink every tracked segment. Idempotent.
    pub fn release_all(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        debug!(count = self.segments.len(), "releasing output segments");
        self.segments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
        assert!(a.starts_with("px-"));
    }

    #[test]
    fn release_all_detaches_and_is_idempotent() {
        let mut registry = SegmentRegistry::new();
        let key = generate_key();
        registry.register(SharedSegment::create(&key, 16).unwrap());
        assert_eq!(registry.len(), 1);

        registry.release_all();
        assert!(registry.is_empty());
        // Objects are gone once released.
        assert!(SharedSegment::attach_read_only(&key).is_err());

        registry.release_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn drop_releases_tracked_segments() {
        let key = generate_key();
        {
            let mut registry = SegmentRegistry::new();
            registry.register(SharedSegment::create(&key, 16).unwrap());
        }
        assert!(SharedSegment::attach_read_only(&key).is_err());
    }
}
