//! Keeps a Prometheus `file_sd` target-group file in step with a service
//! registry stored in etcd.
//!
//! Registry keys follow `<prefix>/<service>/<instance>` and hold the instance
//! address. The [`WatchSupervisor`] loads the prefix once, then applies every
//! watch event to the [`ServiceRegistry`] and rewrites the document after each
//! one, reopening the watch whenever the store drops it.

mod config;
mod discovery;
mod errors;
pub mod metrics;
mod registry;
mod store;
mod supervisor;
pub mod utils;

pub use config::*;
pub use discovery::*;
pub use errors::*;
pub use registry::*;
pub use store::*;
pub use supervisor::*;
pub use utils::*;
