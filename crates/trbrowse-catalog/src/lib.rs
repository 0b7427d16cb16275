//! trbrowse-catalog
//!
//! Local tab-separated TR catalog backend. Implements the `DatasetBackend`
//! seam over plain files (one record per line: region, motif, genotype,
//! copy number) with a lazily built per-dataset index, plus a filesystem
//! folder browser.

pub mod browser;
pub mod catalog;
pub mod pathogenic;

pub use browser::LocalFolderBrowser;
pub use catalog::LocalCatalogBackend;
pub use pathogenic::PathogenicLocus;
