//! Load-once access to a shared model.

use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use crate::error::Result;

use super::ModelLoader;

/// Hands out a shared model, loading it on first use.
///
/// Concurrent callers of [`ModelProvider::get`] wait on one another, so
/// the loader runs at most once per successful load. A failed load is
/// not cached: the next call tries again.
pub struct ModelProvider<L: ModelLoader> {
    loader: L,
    model: Mutex<Option<Arc<L::Model>>>,
}

impl<L: ModelLoader> ModelProvider<L> {
    /// Wrap a loader; nothing is loaded yet.
    #[must_use]
    pub const fn new(loader: L) -> Self {
        Self {
            loader,
            model: Mutex::new(None),
        }
    }

    /// Wrap an already loaded model.
    #[must_use]
    pub fn preloaded(loader: L, model: L::Model) -> Self {
        Self {
            loader,
            model: Mutex::new(Some(Arc::new(model))),
        }
    }

    /// The shared model, loading it if this is the first call.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if loading fails.
    pub fn get(&self) -> Result<Arc<L::Model>> {
        // The slot is either empty or holds a complete model, so a
        // poisoned lock is still consistent
        let mut slot = self.model.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        tracing::info!("Loading style transfer model...");
        let model = Arc::new(self.loader.load()?);
        tracing::info!("Model loaded");

        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Whether the model has been loaded.
    ///
    /// Never waits: while another caller is still loading, this reports
    /// `false`.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        match self.model.try_lock() {
            Ok(slot) => slot.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// The underlying loader.
    #[must_use]
    pub const fn loader(&self) -> &L {
        &self.loader
    }
}
