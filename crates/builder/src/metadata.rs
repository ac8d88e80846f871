//! Metadata collaborator boundary
//!
//! Extracting project facts from manifests belongs to an external
//! collaborator; the executor only consumes the result during Analyze.

use async_trait::async_trait;
use std::path::Path;
use wheelwright_errors::Result;
use wheelwright_types::ProjectMetadata;

/// Supplies project metadata for a materialized source tree
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Collect metadata for the given source tree.
    ///
    /// # Errors
    ///
    /// Any error here is classified `AnalyzeFailed` by the executor.
    async fn collect(&self, source_dir: &Path) -> Result<ProjectMetadata>;
}

/// Passthrough provider returning pre-supplied metadata.
///
/// Callers that already ran their metadata collaborator hand the result in
/// through this; it is also the default when nothing is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    metadata: ProjectMetadata,
}

impl StaticMetadata {
    #[must_use]
    pub fn new(metadata: ProjectMetadata) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadata {
    async fn collect(&self, _source_dir: &Path) -> Result<ProjectMetadata> {
        Ok(self.metadata.clone())
    }
}
