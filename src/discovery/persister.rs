use std::path::Path;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use super::encode_document;
use super::DiscoveryGroup;
use crate::file_io::replace_file_atomically;
use crate::Result;

/// Destination for the derived discovery document
#[cfg_attr(test, automock)]
pub trait Persister: Send + Sync + 'static {
    /// Replaces the whole destination with `groups`.
    ///
    /// On error the destination keeps its previous complete content.
    fn persist(
        &self,
        groups: &[DiscoveryGroup],
    ) -> Result<()>;
}

/// Writes the document as JSON to a single file, replaced atomically
#[derive(Debug, Clone)]
pub struct FilePersister {
    path: PathBuf,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persister for FilePersister {
    fn persist(
        &self,
        groups: &[DiscoveryGroup],
    ) -> Result<()> {
        let content = encode_document(groups)?;
        replace_file_atomically(&self.path, &content)?;
        debug!(
            path = %self.path.display(),
            groups = groups.len(),
            bytes = content.len(),
            "Discovery document written"
        );
        Ok(())
    }
}
