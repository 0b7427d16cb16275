//! Thin query layer between the engine and a [`DatasetBackend`].
//!
//! Centralizes the wildcard-collapse rule for genotype selections and the
//! classification of empty result pages, so the engine proper never has to
//! reason about either.

use std::sync::Arc;

use trbrowse_core::error::{BrowseError, Result};
use trbrowse_core::traits::DatasetBackend;
use trbrowse_core::types::{
    AdvancedQuery, DatasetRef, DatasetSummary, FolderSummary, IndexHit, PageResult, PAGE_SIZE,
};

/// Why a returned page has the records it has. Lets callers tell "your
/// filter matched nothing" apart from "the dataset is empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Matched,
    FilterEliminatedAll,
    DatasetEmpty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedResult {
    pub page: PageResult,
    pub outcome: FilterOutcome,
}

/// Collapses a selection that covers the whole vocabulary (or selects
/// nothing) to the wildcard form. A full selection and no selection are
/// semantically identical, and the wildcard form is the one backends can
/// serve without filtering.
fn effective<'a>(selected: &'a [String], vocabulary: &[String]) -> Option<&'a [String]> {
    if selected.is_empty() || (!vocabulary.is_empty() && selected.len() == vocabulary.len()) {
        None
    } else {
        Some(selected)
    }
}

fn classify(page: &PageResult) -> FilterOutcome {
    if !page.records.is_empty() || page.total_matching > 0 {
        FilterOutcome::Matched
    } else if page.total_regions > 0 {
        FilterOutcome::FilterEliminatedAll
    } else {
        FilterOutcome::DatasetEmpty
    }
}

pub struct DatasetQueryFacade<B: DatasetBackend> {
    backend: Arc<B>,
}

impl<B: DatasetBackend> DatasetQueryFacade<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub async fn load(&self, dataset: &DatasetRef) -> Result<DatasetSummary> {
        self.backend.load(dataset).await
    }

    pub async fn query(
        &self,
        dataset: &DatasetRef,
        selected_genotypes: &[String],
        vocabulary: &[String],
        page: usize,
    ) -> Result<PageResult> {
        let filter = effective(selected_genotypes, vocabulary);
        self.backend.query(dataset, filter, page, PAGE_SIZE).await
    }

    /// Advanced query with the genotype list already resolved by the
    /// caller; the wildcard collapse still applies to it here.
    pub async fn query_advanced(
        &self,
        dataset: &DatasetRef,
        mut query: AdvancedQuery,
        vocabulary: &[String],
        page: usize,
    ) -> Result<AdvancedResult> {
        if let Some(genotypes) = &query.genotypes {
            if effective(genotypes, vocabulary).is_none() {
                query.genotypes = None;
            }
        }
        let page = self
            .backend
            .query_advanced(dataset, &query, page, PAGE_SIZE)
            .await?;
        let outcome = classify(&page);
        Ok(AdvancedResult { page, outcome })
    }

    /// Resolves a 0-based ordinal to its page. Out-of-range ordinals are
    /// rejected against `total_matching` before the backend is asked.
    pub async fn find_page_for_index(
        &self,
        dataset: &DatasetRef,
        index: usize,
        total_matching: usize,
        selected_genotypes: &[String],
        vocabulary: &[String],
    ) -> Result<IndexHit> {
        if index >= total_matching {
            return Err(BrowseError::Range {
                index,
                total: total_matching,
            });
        }
        let filter = effective(selected_genotypes, vocabulary);
        self.backend
            .find_by_index(dataset, index, filter, PAGE_SIZE)
            .await
    }

    pub async fn find_page_for_region(
        &self,
        dataset: &DatasetRef,
        region: &str,
        selected_genotypes: &[String],
        vocabulary: &[String],
    ) -> Result<usize> {
        let filter = effective(selected_genotypes, vocabulary);
        self.backend
            .find_by_region(dataset, region, filter, PAGE_SIZE)
            .await
    }

    pub async fn load_folder(&self, folder: &DatasetRef) -> Result<FolderSummary> {
        self.backend.load_folder(folder).await
    }

    pub async fn list_folder_regions(&self, folder: &DatasetRef) -> Result<Vec<String>> {
        self.backend.list_folder_regions(folder).await
    }
}
