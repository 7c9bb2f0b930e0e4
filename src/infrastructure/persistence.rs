use crate::domain::{Catalog, CatalogError, CatalogResult};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub struct FileRepository;

impl FileRepository {
    /// Writes the catalog as pretty JSON. The file is replaced through a
    /// sibling temp file so a failed write never truncates the old snapshot.
    pub fn save_catalog(catalog: &Catalog, path: &Path) -> CatalogResult<()> {
        let json = serde_json::to_string_pretty(catalog)
            .map_err(|e| CatalogError::Storage(format!("Serialization failed: {}", e)))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, &json)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|e| CatalogError::Storage(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = json.len(), "catalog snapshot written");
        Ok(())
    }

    pub fn load_catalog(path: &Path) -> CatalogResult<Catalog> {
        let content = fs::read_to_string(path)
            .map_err(|e| CatalogError::Storage(format!("{}: {}", path.display(), e)))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .map_err(|e| CatalogError::Storage(format!("Invalid file format - {}", e)))?;
        catalog.check_integrity()?;
        info!(path = %path.display(), "catalog loaded");
        Ok(catalog)
    }

    /// Loads the snapshot, or starts empty when the file does not exist yet.
    pub fn load_or_default(path: &Path) -> CatalogResult<Catalog> {
        if path.exists() {
            Self::load_catalog(path)
        } else {
            info!(path = %path.display(), "no catalog file, starting empty");
            Ok(Catalog::default())
        }
    }
}
