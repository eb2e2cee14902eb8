//! Shared, lazily loaded price dataset
//!
//! The dataset is read on first use and then handed out as `Arc` snapshots.
//! A reload parses the file without holding the lock and swaps the new
//! snapshot in; callers holding the old one keep a consistent view.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::LoadError;
use crate::loader::load_csv;
use crate::model::PriceSeries;

#[derive(Debug)]
pub struct PriceCache {
    path: PathBuf,
    series: RwLock<Option<Arc<PriceSeries>>>,
}

impl PriceCache {
    /// Cache over the CSV at `path`; nothing is read until [`PriceCache::get`]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            series: RwLock::new(None),
        }
    }

    /// Cache already holding `series`; [`PriceCache::reload`] re-reads `path`
    #[must_use]
    pub fn with_series(path: impl Into<PathBuf>, series: PriceSeries) -> Self {
        Self {
            path: path.into(),
            series: RwLock::new(Some(Arc::new(series))),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Current snapshot, loading the file on first call
    pub fn get(&self) -> Result<Arc<PriceSeries>, LoadError> {
        if let Some(series) = self
            .series
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(series));
        }

        let loaded = Arc::new(load_csv(&self.path)?);
        let mut slot = self.series.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished loading first; keep theirs
        Ok(Arc::clone(slot.get_or_insert(loaded)))
    }

    /// Re-read the file and replace the snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<PriceSeries>, LoadError> {
        let loaded = Arc::new(load_csv(&self.path)?);
        let mut slot = self.series.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&loaded));
        tracing::info!(days = loaded.len(), "Price cache reloaded");
        Ok(loaded)
    }
}
