//! Shared catalog storage with scoped transactions.
//!
//! A transaction holds the write lock for its whole lifetime and works on a
//! private copy of the catalog. Commit swaps the copy in; rollback (explicit,
//! or by dropping the transaction) discards it. Readers therefore see either
//! the state before a transaction or the state after it, never a mix.

use super::persistence::FileRepository;
use crate::domain::{Catalog, CatalogError, CatalogResult};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Cloneable handle to the shared catalog. Clones share the catalog and the
/// autosave target.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    inner: Arc<RwLock<Catalog>>,
    autosave: Arc<Mutex<Option<PathBuf>>>,
}

impl CatalogStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(catalog)),
            autosave: Arc::default(),
        }
    }

    /// Every commit will first write the new snapshot to `path`. A failed
    /// write aborts the commit.
    pub fn with_autosave(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut target) = self.autosave.lock() {
            *target = Some(path.into());
        }
        self
    }

    /// File that commits are written to, if autosave is on.
    pub fn autosave_path(&self) -> CatalogResult<Option<PathBuf>> {
        let target = self
            .autosave
            .lock()
            .map_err(|_| CatalogError::Storage("autosave target poisoned".to_string()))?;
        Ok(target.clone())
    }

    /// Points autosave at `path`. A store without autosave stays without it.
    pub fn rebind_autosave(&self, path: &Path) -> CatalogResult<()> {
        let mut target = self
            .autosave
            .lock()
            .map_err(|_| CatalogError::Storage("autosave target poisoned".to_string()))?;
        if let Some(current) = target.as_mut() {
            if current.as_path() != path {
                info!(from = %current.display(), to = %path.display(), "autosave target changed");
                *current = path.to_path_buf();
            }
        }
        Ok(())
    }

    /// Runs `f` against a consistent view of the catalog.
    pub fn read<R>(&self, f: impl FnOnce(&Catalog) -> R) -> CatalogResult<R> {
        let guard = self
            .inner
            .read()
            .map_err(|_| CatalogError::Storage("catalog lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    pub fn snapshot(&self) -> CatalogResult<Catalog> {
        self.read(Catalog::clone)
    }

    /// Replaces the whole catalog with one read from `source`. Nothing is
    /// written: `source` already holds this catalog, and later commits are
    /// autosaved there instead of to the previous file.
    pub fn replace(&self, catalog: Catalog, source: &Path) -> CatalogResult<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| CatalogError::Storage("catalog lock poisoned".to_string()))?;
        self.rebind_autosave(source)?;
        *guard = catalog;
        debug!(source = %source.display(), "catalog replaced");
        Ok(())
    }

    pub fn begin(&self) -> CatalogResult<Transaction<'_>> {
        let guard = self
            .inner
            .write()
            .map_err(|_| CatalogError::Storage("catalog lock poisoned".to_string()))?;
        let working = guard.clone();
        let autosave = self.autosave_path()?;
        Ok(Transaction {
            guard,
            working,
            autosave,
            closed: false,
        })
    }

    /// Runs `f` in a transaction: commit on `Ok`, rollback on `Err`.
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let mut tx = self.begin()?;
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }
}

/// An open write transaction. Dereferences to the working copy of the catalog.
pub struct Transaction<'a> {
    guard: RwLockWriteGuard<'a, Catalog>,
    working: Catalog,
    autosave: Option<PathBuf>,
    closed: bool,
}

impl Transaction<'_> {
    pub fn commit(mut self) -> CatalogResult<()> {
        if let Some(path) = &self.autosave {
            if let Err(err) = FileRepository::save_catalog(&self.working, path) {
                warn!(error = %err, "autosave failed, transaction rolled back");
                self.closed = true;
                return Err(err);
            }
        }
        *self.guard = std::mem::take(&mut self.working);
        self.closed = true;
        debug!("transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) {
        self.closed = true;
        debug!("transaction rolled back");
    }
}

impl Deref for Transaction<'_> {
    type Target = Catalog;

    fn deref(&self) -> &Catalog {
        &self.working
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Catalog {
        &mut self.working
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.closed {
            debug!("transaction dropped without commit, rolled back");
        }
    }
}
