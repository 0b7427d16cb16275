//! Lazily indexed TR catalog files.
//!
//! A catalog is a tab-separated file, one record per line:
//! `region<TAB>motif<TAB>genotype<TAB>copy_number`, `#`-prefixed lines
//! ignored. `load` only validates readability; the full index is built on
//! the first query against the dataset, which is also where the genotype
//! and chromosome vocabularies are discovered and reported back through
//! the page-result side channel.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use trbrowse_core::error::{BrowseError, Result};
use trbrowse_core::region::Region;
use trbrowse_core::traits::DatasetBackend;
use trbrowse_core::types::{
    AdvancedQuery, DatasetRef, DatasetSummary, FolderSummary, IndexHit, PageResult,
    PathogenicAssessment, RegionRecord,
};

use crate::pathogenic::{find_overlapping, known_loci, PathogenicLocus};

/// File extension recognized as a TR catalog.
pub const CATALOG_EXT: &str = "tsv";

#[derive(Debug, Clone)]
struct CatalogRecord {
    id: String,
    region: Region,
    region_str: String,
    motif: String,
    genotype: String,
    copy_number: f64,
}

struct CatalogIndex {
    records: Vec<CatalogRecord>,
    genotypes: Vec<String>,
    chromosomes: Vec<String>,
}

pub struct LocalCatalogBackend {
    loci: Vec<PathogenicLocus>,
    catalogs: RwLock<HashMap<PathBuf, Arc<CatalogIndex>>>,
    folders: RwLock<HashMap<PathBuf, Vec<PathBuf>>>,
}

impl Default for LocalCatalogBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCatalogBackend {
    pub fn new() -> Self {
        Self {
            loci: known_loci(),
            catalogs: RwLock::new(HashMap::new()),
            folders: RwLock::new(HashMap::new()),
        }
    }

    fn parse_line(line: &str, line_no: usize, next_id: usize) -> Result<Option<CatalogRecord>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let mut cols = trimmed.split('\t');
        let (region_col, motif, genotype, cn) = match (
            cols.next(),
            cols.next(),
            cols.next(),
            cols.next(),
        ) {
            (Some(r), Some(m), Some(g), Some(c)) => (r, m, g, c),
            _ => {
                return Err(BrowseError::Load(format!(
                    "line {line_no}: expected 4 tab-separated columns"
                )))
            }
        };
        let region = Region::parse(region_col)
            .map_err(|_| BrowseError::Load(format!("line {line_no}: bad region '{region_col}'")))?;
        let copy_number: f64 = cn.trim().parse().map_err(|_| {
            BrowseError::Load(format!("line {line_no}: bad copy number '{cn}'"))
        })?;
        Ok(Some(CatalogRecord {
            id: format!("TR{next_id:06}"),
            region_str: region.to_string(),
            region,
            motif: motif.trim().to_string(),
            genotype: genotype.trim().to_string(),
            copy_number,
        }))
    }

    fn build_index(path: &Path) -> Result<CatalogIndex> {
        let raw = fs::read_to_string(path)
            .map_err(|e| BrowseError::Load(format!("{}: {e}", path.display())))?;
        let mut records = Vec::new();
        for (i, line) in raw.lines().enumerate() {
            if let Some(record) = Self::parse_line(line, i + 1, records.len() + 1)
                .map_err(|e| BrowseError::Load(format!("{}: {e}", path.display())))?
            {
                records.push(record);
            }
        }
        let genotypes: BTreeSet<String> = records.iter().map(|r| r.genotype.clone()).collect();
        let chromosomes: BTreeSet<String> = records.iter().map(|r| r.region.chrom.clone()).collect();
        Ok(CatalogIndex {
            records,
            genotypes: genotypes.into_iter().collect(),
            chromosomes: chromosomes.into_iter().collect(),
        })
    }

    /// Returns the index for `dataset`, building it on first use.
    /// The bool reports whether this call built it (vocabulary discovery).
    fn ensure_index(&self, dataset: &DatasetRef) -> Result<(Arc<CatalogIndex>, bool)> {
        let path = PathBuf::from(dataset.as_str());
        if let Some(index) = self
            .catalogs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path)
        {
            return Ok((Arc::clone(index), false));
        }
        tracing::debug!(path = %path.display(), "building catalog index");
        let built = Arc::new(Self::build_index(&path)?);
        let mut guard = self.catalogs.write().unwrap_or_else(PoisonError::into_inner);
        let entry = guard.entry(path).or_insert_with(|| Arc::clone(&built));
        Ok((Arc::clone(entry), true))
    }

    fn is_pathogenic(&self, record: &CatalogRecord) -> bool {
        find_overlapping(&self.loci, &record.region)
            .is_some_and(|locus| record.copy_number >= locus.threshold)
    }

    fn matches_advanced(&self, record: &CatalogRecord, query: &AdvancedQuery) -> bool {
        let motif_size = record.motif.len() as u32;
        if query.motif_size_min.is_some_and(|min| motif_size < min) {
            return false;
        }
        if query.motif_size_max.is_some_and(|max| motif_size > max) {
            return false;
        }
        if query.cn_min.is_some_and(|min| record.copy_number < min) {
            return false;
        }
        if query.cn_max.is_some_and(|max| record.copy_number > max) {
            return false;
        }
        if let Some(chroms) = &query.chromosomes {
            if !chroms.iter().any(|c| c == &record.region.chrom) {
                return false;
            }
        }
        if let Some(genotypes) = &query.genotypes {
            if !genotypes.iter().any(|g| g == &record.genotype) {
                return false;
            }
        }
        if query.pathogenic_only && !self.is_pathogenic(record) {
            return false;
        }
        if let Some(annotated) = &query.annotated_regions {
            let set: HashSet<&str> = annotated.iter().map(String::as_str).collect();
            if !set.contains(record.region_str.as_str()) {
                return false;
            }
        }
        true
    }

    fn page_of<'a>(
        index: &'a CatalogIndex,
        filtered: Vec<&'a CatalogRecord>,
        page: usize,
        page_size: usize,
        discovered: bool,
    ) -> Result<PageResult> {
        let total_matching = filtered.len();
        let total_pages = total_matching.div_ceil(page_size);
        if total_matching > 0 && page >= total_pages {
            return Err(BrowseError::Query(format!(
                "page {page} out of range, only {total_pages} page(s) available"
            )));
        }
        let start = page * page_size;
        let records = filtered
            .into_iter()
            .skip(start)
            .take(page_size)
            .map(|r| RegionRecord {
                id: r.id.clone(),
                region: r.region_str.clone(),
                genotype: r.genotype.clone(),
            })
            .collect();
        Ok(PageResult {
            records,
            total_matching,
            total_regions: index.records.len(),
            current_page: page,
            total_pages,
            discovered_genotypes: discovered.then(|| index.genotypes.clone()),
            discovered_chromosomes: discovered.then(|| index.chromosomes.clone()),
        })
    }

    fn filter_by_genotype<'a>(
        index: &'a CatalogIndex,
        genotype_filter: Option<&[String]>,
    ) -> Vec<&'a CatalogRecord> {
        index
            .records
            .iter()
            .filter(|r| match genotype_filter {
                None => true,
                Some(list) => list.iter().any(|g| g == &r.genotype),
            })
            .collect()
    }

    fn scan_folder(folder: &Path) -> Result<Vec<PathBuf>> {
        if !folder.is_dir() {
            return Err(BrowseError::Load(format!(
                "{} is not a readable folder",
                folder.display()
            )));
        }
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(folder)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(CATALOG_EXT))
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(BrowseError::Load(format!(
                "no catalog files found under {}",
                folder.display()
            )));
        }
        Ok(files)
    }
}

/// Numeric-aware chromosome ordering: chr2 before chr10, names after numbers.
fn chrom_sort_key(chrom: &str) -> (u64, String) {
    let bare = chrom.strip_prefix("chr").unwrap_or(chrom);
    match bare.parse::<u64>() {
        Ok(n) => (n, String::new()),
        Err(_) => (u64::MAX, bare.to_string()),
    }
}

#[async_trait]
impl DatasetBackend for LocalCatalogBackend {
    async fn load(&self, dataset: &DatasetRef) -> Result<DatasetSummary> {
        let path = PathBuf::from(dataset.as_str());
        if !path.is_file() {
            return Err(BrowseError::Load(format!(
                "{} is not a readable catalog file",
                path.display()
            )));
        }
        // Readability check only; indexing is deferred to the first query.
        fs::File::open(&path).map_err(|e| BrowseError::Load(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "registered catalog");
        Ok(DatasetSummary::default())
    }

    async fn query(
        &self,
        dataset: &DatasetRef,
        genotype_filter: Option<&[String]>,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult> {
        let (index, discovered) = self.ensure_index(dataset)?;
        let filtered = Self::filter_by_genotype(&index, genotype_filter);
        Self::page_of(&index, filtered, page, page_size, discovered)
    }

    async fn query_advanced(
        &self,
        dataset: &DatasetRef,
        query: &AdvancedQuery,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult> {
        let (index, discovered) = self.ensure_index(dataset)?;
        let filtered: Vec<&CatalogRecord> = index
            .records
            .iter()
            .filter(|r| self.matches_advanced(r, query))
            .collect();
        Self::page_of(&index, filtered, page, page_size, discovered)
    }

    async fn find_by_index(
        &self,
        dataset: &DatasetRef,
        index: usize,
        genotype_filter: Option<&[String]>,
        page_size: usize,
    ) -> Result<IndexHit> {
        let (catalog, _) = self.ensure_index(dataset)?;
        let filtered = Self::filter_by_genotype(&catalog, genotype_filter);
        let record = filtered.get(index).ok_or(BrowseError::Range {
            index,
            total: filtered.len(),
        })?;
        Ok(IndexHit {
            page: index / page_size,
            region: record.region_str.clone(),
        })
    }

    async fn find_by_region(
        &self,
        dataset: &DatasetRef,
        region: &str,
        genotype_filter: Option<&[String]>,
        page_size: usize,
    ) -> Result<usize> {
        let (catalog, _) = self.ensure_index(dataset)?;
        let filtered = Self::filter_by_genotype(&catalog, genotype_filter);
        let position = filtered
            .iter()
            .position(|r| r.region_str == region)
            .ok_or_else(|| BrowseError::Resolution(region.to_string()))?;
        Ok(position / page_size)
    }

    async fn load_folder(&self, folder: &DatasetRef) -> Result<FolderSummary> {
        let path = PathBuf::from(folder.as_str());
        let files = Self::scan_folder(&path)?;
        let file_count = files.len();
        self.folders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, files);
        Ok(FolderSummary { file_count })
    }

    async fn list_folder_regions(&self, folder: &DatasetRef) -> Result<Vec<String>> {
        let path = PathBuf::from(folder.as_str());
        let files = {
            let guard = self.folders.read().unwrap_or_else(PoisonError::into_inner);
            guard.get(&path).cloned()
        };
        // A folder saved in a session may be queried before an explicit
        // load; register it on the fly.
        let files = match files {
            Some(files) => files,
            None => {
                let scanned = Self::scan_folder(&path)?;
                self.folders
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(path, scanned.clone());
                scanned
            }
        };
        let mut regions: BTreeSet<(u64, String, u64, u64, String)> = BTreeSet::new();
        for file in &files {
            let (index, _) = self.ensure_index(&DatasetRef::new(file.display().to_string()))?;
            for record in &index.records {
                let (num, name) = chrom_sort_key(&record.region.chrom);
                regions.insert((
                    num,
                    name,
                    record.region.start,
                    record.region.end,
                    record.region_str.clone(),
                ));
            }
        }
        Ok(regions.into_iter().map(|(.., region)| region).collect())
    }

    async fn check_pathogenic(&self, region: &Region) -> Result<PathogenicAssessment> {
        Ok(match find_overlapping(&self.loci, region) {
            Some(locus) => PathogenicAssessment {
                pathogenic: true,
                gene: Some(locus.gene.to_string()),
                disease: Some(locus.disease.to_string()),
                inheritance: Some(locus.inheritance.to_string()),
                threshold: Some(locus.threshold),
            },
            None => PathogenicAssessment::default(),
        })
    }
}
