use std::path::Path;

use crate::error::Result;
use crate::types::{BuildArtifacts, Catalog, SearchIndex};

/// Builds the token index over a finalized catalog. Must be a pure function
/// of the catalog.
pub trait CatalogIndexer: Send + Sync {
    fn build(&self, catalog: &Catalog) -> Result<SearchIndex>;
}

/// Publishes a build into a (staging) directory. Returns the number of
/// shard files written.
pub trait ArtifactWriter: Send + Sync {
    fn write(&self, dir: &Path, artifacts: &BuildArtifacts<'_>) -> Result<usize>;
}
