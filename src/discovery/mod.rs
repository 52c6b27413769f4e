//! Derivation of the Prometheus target-group document and its persistence.

mod document;
mod persister;
pub use document::*;
pub use persister::*;

#[cfg(test)]
mod document_test;
#[cfg(test)]
mod persister_test;
