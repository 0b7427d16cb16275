//! Filesystem implementation of the folder-browsing seam.

use std::fs;
use std::path::Path;

use trbrowse_core::error::{BrowseError, Result};
use trbrowse_core::traits::FolderBrowser;
use trbrowse_core::types::{BrowseListing, BrowseTarget};

use crate::catalog::CATALOG_EXT;

#[derive(Debug, Default)]
pub struct LocalFolderBrowser;

impl LocalFolderBrowser {
    pub fn new() -> Self {
        Self
    }
}

impl FolderBrowser for LocalFolderBrowser {
    fn browse(&self, path: &Path, target: BrowseTarget) -> Result<BrowseListing> {
        let entries = fs::read_dir(path)
            .map_err(|e| BrowseError::Load(format!("{}: {e}", path.display())))?;

        let mut directories = Vec::new();
        let mut files = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                directories.push(name);
            } else if matches!(target, BrowseTarget::DatasetFiles)
                && Path::new(&name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(CATALOG_EXT))
            {
                files.push(name);
            }
        }
        directories.sort();
        files.sort();

        Ok(BrowseListing {
            path: path.display().to_string(),
            parent: path.parent().map(|p| p.display().to_string()),
            directories,
            files,
        })
    }
}
