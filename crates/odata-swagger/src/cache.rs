//! Per-provider document cache.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::document::Document;

/// Holds at most one assembled document.
///
/// The lock is held while the document is computed, so concurrent first
/// requests assemble once and then share the result. Failed assemblies are
/// not cached.
#[derive(Debug, Default)]
pub struct DocumentCache {
    slot: Mutex<Option<Arc<Document>>>,
}

impl DocumentCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached document, computing it with `init` on a miss.
    ///
    /// # Errors
    ///
    /// Returns whatever `init` returns; the cache stays empty.
    pub fn get_or_try_init<E>(
        &self,
        init: impl FnOnce() -> Result<Document, E>,
    ) -> Result<Arc<Document>, E> {
        let mut slot = self.slot.lock();
        if let Some(document) = slot.as_ref() {
            tracing::debug!("document cache hit");
            return Ok(Arc::clone(document));
        }
        tracing::debug!("document cache miss, assembling");
        let document = Arc::new(init()?);
        *slot = Some(Arc::clone(&document));
        Ok(document)
    }

    /// Drop the cached document; the next request reassembles.
    pub fn invalidate(&self) {
        if self.slot.lock().take().is_some() {
            tracing::debug!("document cache invalidated");
        }
    }

    /// Whether a document is currently cached.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.slot.lock().is_some()
    }
}
