//! Shared fixtures: a delegating backend that counts calls and records
//! the genotype filter each query carried, plus catalog file builders.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use trbrowse_core::error::Result;
use trbrowse_core::region::Region;
use trbrowse_core::traits::DatasetBackend;
use trbrowse_core::types::{
    AdvancedQuery, DatasetRef, DatasetSummary, FolderSummary, IndexHit, PageResult,
    PathogenicAssessment,
};

pub struct CountingBackend<B> {
    inner: B,
    pub queries: AtomicUsize,
    pub advanced_queries: AtomicUsize,
    pub region_lookups: AtomicUsize,
    pub last_genotype_filter: Mutex<Option<Option<Vec<String>>>>,
}

impl<B> CountingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
            advanced_queries: AtomicUsize::new(0),
            region_lookups: AtomicUsize::new(0),
            last_genotype_filter: Mutex::new(None),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst) + self.advanced_queries.load(Ordering::SeqCst)
    }

    /// The genotype filter of the most recent plain query.
    pub fn last_filter(&self) -> Option<Option<Vec<String>>> {
        self.last_genotype_filter.lock().unwrap().clone()
    }
}

#[async_trait]
impl<B: DatasetBackend> DatasetBackend for CountingBackend<B> {
    async fn load(&self, dataset: &DatasetRef) -> Result<DatasetSummary> {
        self.inner.load(dataset).await
    }

    async fn query(
        &self,
        dataset: &DatasetRef,
        genotype_filter: Option<&[String]>,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        *self.last_genotype_filter.lock().unwrap() =
            Some(genotype_filter.map(<[String]>::to_vec));
        self.inner.query(dataset, genotype_filter, page, page_size).await
    }

    async fn query_advanced(
        &self,
        dataset: &DatasetRef,
        query: &AdvancedQuery,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult> {
        self.advanced_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query_advanced(dataset, query, page, page_size).await
    }

    async fn find_by_index(
        &self,
        dataset: &DatasetRef,
        index: usize,
        genotype_filter: Option<&[String]>,
        page_size: usize,
    ) -> Result<IndexHit> {
        self.inner
            .find_by_index(dataset, index, genotype_filter, page_size)
            .await
    }

    async fn find_by_region(
        &self,
        dataset: &DatasetRef,
        region: &str,
        genotype_filter: Option<&[String]>,
        page_size: usize,
    ) -> Result<usize> {
        self.region_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner
            .find_by_region(dataset, region, genotype_filter, page_size)
            .await
    }

    async fn load_folder(&self, folder: &DatasetRef) -> Result<FolderSummary> {
        self.inner.load_folder(folder).await
    }

    async fn list_folder_regions(&self, folder: &DatasetRef) -> Result<Vec<String>> {
        self.inner.list_folder_regions(folder).await
    }

    async fn check_pathogenic(&self, region: &Region) -> Result<PathogenicAssessment> {
        self.inner.check_pathogenic(region).await
    }
}

pub fn write_catalog(dir: &Path, name: &str, rows: &[(String, &str, &str, f64)]) -> DatasetRef {
    let mut out = String::from("# region\tmotif\tgenotype\tcopy_number\n");
    for (region, motif, genotype, cn) in rows {
        writeln!(out, "{region}\t{motif}\t{genotype}\t{cn}").unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, out).unwrap();
    DatasetRef::new(path.display().to_string())
}

/// 120 records, even ordinals on chr1 and odd on chr2, genotypes cycling
/// 0/0, 0/1, 1/1, copy number equal to the ordinal.
pub fn numbered_catalog(dir: &Path) -> DatasetRef {
    let genotypes = ["0/0", "0/1", "1/1"];
    let mut rows = Vec::new();
    for i in 0..120u64 {
        let chrom = if i % 2 == 0 { "chr1" } else { "chr2" };
        let start = 1_000 + i * 1_000;
        rows.push((
            format!("{chrom}:{start}-{}", start + 500),
            "CAG",
            genotypes[(i % 3) as usize],
            i as f64,
        ));
    }
    write_catalog(dir, "numbered.tsv", &rows)
}

/// The region string at a given 0-based ordinal of the numbered catalog
/// (records keep file order).
pub fn numbered_region(ordinal: usize) -> String {
    let i = ordinal as u64;
    let chrom = if i % 2 == 0 { "chr1" } else { "chr2" };
    let start = 1_000 + i * 1_000;
    format!("{chrom}:{start}-{}", start + 500)
}
