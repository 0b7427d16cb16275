//! Domain types shared by the browsing engine, backends and stores.

use serde::{Deserialize, Serialize};

/// Fixed page size shared by every paginated call. Changing it client-side
/// without backend agreement would desynchronize `total_pages`.
pub const PAGE_SIZE: usize = 50;

/// Mutually exclusive browsing contexts with isolated state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Individual,
    CohortRead,
    CohortAssembly,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Individual => "individual",
            Mode::CohortRead => "cohort-read",
            Mode::CohortAssembly => "cohort-assembly",
        }
    }

    /// The two cohort modes share one browsing-state shape.
    pub fn is_cohort(&self) -> bool {
        matches!(self, Mode::CohortRead | Mode::CohortAssembly)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque locator for a loaded TR catalog file or cohort folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRef(String);

impl DatasetRef {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path-separator and trailing-slash insensitive form, used to detect
    /// redundant re-loads of an already loaded folder.
    pub fn normalized(&self) -> String {
        self.0.replace('\\', "/").trim_end_matches('/').to_string()
    }
}

impl std::fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for DatasetRef {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// One TR record as presented by a page of results. Opaque to the engine
/// beyond these fields; rendering detail belongs elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: String,
    /// Canonical `chromosome:start-end` span.
    pub region: String,
    pub genotype: String,
}

/// What a backend reports immediately after loading a dataset.
///
/// `total_regions` is `None` for lazily indexed backends, and the
/// vocabularies may be empty until the first query reveals them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_regions: Option<usize>,
    pub genotypes: Vec<String>,
    pub chromosomes: Vec<String>,
}

/// One page of filtered results.
///
/// Pages are 0-indexed. Invariant: `current_page < total_pages` whenever
/// `total_matching > 0`. The `discovered_*` fields are the vocabulary side
/// channel, populated by the query that first indexes a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    pub records: Vec<RegionRecord>,
    /// Records matching the active filter, across all pages.
    pub total_matching: usize,
    /// Records in the dataset with no filter applied.
    pub total_regions: usize,
    pub current_page: usize,
    pub total_pages: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_genotypes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_chromosomes: Option<Vec<String>>,
}

/// Advanced filter specification. Unset fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motif_size_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motif_size_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cn_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cn_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromosomes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genotypes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pathogenic_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_annotations: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_tags: Option<Vec<String>>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the annotation index must be (re)computed before querying.
    pub fn wants_annotation_scan(&self) -> bool {
        self.has_annotations == Some(true)
            || self
                .annotation_tags
                .as_ref()
                .is_some_and(|tags| !tags.is_empty())
    }
}

/// The wire shape of an advanced query. Annotation predicates are already
/// folded into `annotated_regions` because only the client holds the
/// annotation records; backends never see the predicate itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedQuery {
    pub motif_size_min: Option<u32>,
    pub motif_size_max: Option<u32>,
    pub cn_min: Option<f64>,
    pub cn_max: Option<f64>,
    pub chromosomes: Option<Vec<String>>,
    pub genotypes: Option<Vec<String>>,
    pub pathogenic_only: bool,
    /// `None` = no annotation constraint; `Some(ids)` = record's region must
    /// be one of these (possibly none, which matches nothing).
    pub annotated_regions: Option<Vec<String>>,
}

/// Resolution of an ordinal index to its page and record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexHit {
    pub page: usize,
    pub region: String,
}

/// Pathogenicity lookup result for one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathogenicAssessment {
    pub pathogenic: bool,
    pub gene: Option<String>,
    pub disease: Option<String>,
    pub inheritance: Option<String>,
    /// Pathogenic copy-number threshold for the matched locus, if known.
    pub threshold: Option<f64>,
}

/// Result of registering a cohort folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub file_count: usize,
}

/// What kind of entries a folder-browse call is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseTarget {
    /// Individual TR catalog files.
    DatasetFiles,
    /// Folders that may hold a cohort of catalogs.
    CohortFolders,
}

/// One level of a file/folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseListing {
    pub path: String,
    pub parent: Option<String>,
    pub directories: Vec<String>,
    pub files: Vec<String>,
}
