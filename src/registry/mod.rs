//! In-memory service registry and the key layout it is keyed by.

mod key_path;
mod service_registry;
pub use key_path::*;
pub use service_registry::*;
