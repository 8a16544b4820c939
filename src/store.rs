use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use tracing::debug;

use crate::catalog::Catalog;
use crate::error::IngestError;

pub const CATALOG_FILE: &str = "catalog.json";

/// On-disk home of the catalog.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn catalog_path(&self) -> Utf8PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn ensure_root(&self) -> Result<(), IngestError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))
    }

    /// A store that was never written yields an empty catalog.
    pub fn load_catalog(&self) -> Result<Catalog, IngestError> {
        let path = self.catalog_path();
        if !path.as_std_path().exists() {
            debug!(path = %path, "no catalog yet, starting empty");
            return Ok(Catalog::new());
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        let mut catalog: Catalog = serde_json::from_str(&content)
            .map_err(|err| IngestError::CatalogParse(format!("{path}: {err}")))?;
        catalog.reindex()?;
        Ok(catalog)
    }

    pub fn save_catalog(&self, catalog: &Catalog) -> Result<(), IngestError> {
        let content = serde_json::to_vec_pretty(catalog)
            .map_err(|err| IngestError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&self.catalog_path(), &content)
    }
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), IngestError> {
    let parent = path
        .parent()
        .ok_or_else(|| IngestError::Filesystem(format!("invalid destination path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    let temp = Builder::new()
        .prefix("mutant-ingest")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| IngestError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| IngestError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Every regular, non-hidden file directly inside `dir`, sorted by name.
pub fn list_source_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, IngestError> {
    if !dir.as_std_path().is_dir() {
        return Err(IngestError::SourceNotFound(dir.to_string()));
    }
    let entries =
        fs::read_dir(dir.as_std_path()).map_err(|err| IngestError::Filesystem(err.to_string()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| IngestError::Filesystem(err.to_string()))?;
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|path| IngestError::Filesystem(format!("non UTF-8 path {}", path.display())))?;
        let hidden = path.file_name().is_some_and(|name| name.starts_with('.'));
        if !hidden && path.as_std_path().is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Relative names are looked up inside the source directory.
pub fn resolve_source(dir: &Utf8Path, name: &str) -> Result<Utf8PathBuf, IngestError> {
    let candidate = Utf8Path::new(name);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        dir.join(candidate)
    };
    if path.as_std_path().is_file() {
        Ok(path)
    } else {
        Err(IngestError::SourceNotFound(path.to_string()))
    }
}
