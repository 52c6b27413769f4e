//! Watch supervision: bootstrap from a snapshot, then keep the registry and the
//! discovery document in step with the store for the life of the process.
//!
//! ```text
//! Bootstrapping ──> Watching ──(stream ends)──> Reconnecting ──(delay)──┐
//!                      ^                                                │
//!                      └────────────────────────────────────────────────┘
//! any state ──(shutdown signal)──> Stopped
//! ```

mod watch_supervisor;
pub use watch_supervisor::*;
