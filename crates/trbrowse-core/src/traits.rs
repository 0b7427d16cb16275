//! Seams to the external collaborators: the dataset backend, the persistent
//! key-value state store, and the file/folder browser.

use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BrowseError, Result};
use crate::region::Region;
use crate::types::{
    AdvancedQuery, BrowseListing, BrowseTarget, DatasetRef, DatasetSummary, FolderSummary,
    IndexHit, PageResult, PathogenicAssessment,
};

/// The data backend that stores and queries TR records.
///
/// `genotype_filter = None` means "no filter" (the wildcard form); callers
/// are expected to collapse a full-vocabulary selection to `None` before
/// reaching this seam.
#[async_trait]
pub trait DatasetBackend: Send + Sync {
    /// Registers a dataset. Fails with [`BrowseError::Load`] if the
    /// reference is invalid or unreadable. Lazily indexed implementations
    /// may leave totals and vocabularies empty until the first query.
    async fn load(&self, dataset: &DatasetRef) -> Result<DatasetSummary>;

    async fn query(
        &self,
        dataset: &DatasetRef,
        genotype_filter: Option<&[String]>,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult>;

    async fn query_advanced(
        &self,
        dataset: &DatasetRef,
        query: &AdvancedQuery,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult>;

    /// Resolves a 0-based ordinal index within the filtered result set to
    /// its page and record.
    async fn find_by_index(
        &self,
        dataset: &DatasetRef,
        index: usize,
        genotype_filter: Option<&[String]>,
        page_size: usize,
    ) -> Result<IndexHit>;

    /// Returns the page holding `region` under the given filter, or
    /// [`BrowseError::Resolution`] when the region is filtered out.
    async fn find_by_region(
        &self,
        dataset: &DatasetRef,
        region: &str,
        genotype_filter: Option<&[String]>,
        page_size: usize,
    ) -> Result<usize>;

    /// Registers a cohort folder of per-sample catalogs.
    async fn load_folder(&self, folder: &DatasetRef) -> Result<FolderSummary>;

    /// Sorted union of regions across a loaded cohort folder.
    async fn list_folder_regions(&self, folder: &DatasetRef) -> Result<Vec<String>>;

    async fn check_pathogenic(&self, region: &Region) -> Result<PathogenicAssessment>;
}

/// Persistent key-value store scoped by named keys (criteria, presets,
/// annotations, sessions). Read failures degrade to "no prior state";
/// write failures surface as [`BrowseError::Store`].
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Vec<String>;

    /// Typed read. Malformed stored JSON is logged and treated as absent.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, %err, "discarding malformed stored value");
                None
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value).map_err(|e| BrowseError::Store(e.to_string()))?;
        self.set(key, &raw)
    }
}

/// Hierarchical file/folder browsing service.
pub trait FolderBrowser: Send + Sync {
    fn browse(&self, path: &Path, target: BrowseTarget) -> Result<BrowseListing>;
}
