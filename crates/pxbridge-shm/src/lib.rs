//! Named shared-memory segments for the pxbridge image handoff.
//!
//! Image pixel buffers are too large for the control channel, so both sides
//! pass them through named POSIX shared-memory regions referenced by textual
//! keys embedded in control messages. A segment is created (and later
//! unlinked) by whichever side produces the data; the consumer attaches
//! read-only, locks, bulk-copies, unlocks, and detaches.
//!
//! Locking is a named semaphore bracketing each bulk copy — coarse-grained,
//! no reader/writer distinction, held only for the duration of the copy.
//!
//! [`SegmentRegistry`] tracks every segment this process created for an
//! output batch so each one is detached and unlinked exactly once before the
//! next batch or process exit; stale segments would leak host-visible named
//! memory.

pub mod error;
pub mod registry;
pub mod segment;

pub use error::{Result, ShmError};
pub use registry::{generate_key, SegmentRegistry};
pub use segment::{SegmentGuard, SharedSegment};
