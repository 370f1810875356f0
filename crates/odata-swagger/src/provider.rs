//! The document provider: discovery, binding and assembly for one route
//! table, with optional caching.

use std::fmt;
use std::sync::Arc;

use crate::assemble::assemble;
use crate::cache::DocumentCache;
use crate::config::DocsSettings;
use crate::discover::{discover_all, CandidateOperation, DiscoveryStrategy};
use crate::document::Document;
use crate::error::Result;
use crate::model::RouteTable;
use crate::reflect::TypeReflector;

/// Produces API description documents for a route table.
///
/// Built by [`DocsConfig::build`](crate::DocsConfig::build). Safe to share
/// across threads; each call to [`generate`](Self::generate) is independent.
pub struct SwaggerProvider {
    routes: RouteTable,
    strategies: Vec<Arc<dyn DiscoveryStrategy>>,
    settings: DocsSettings,
    cache: Option<DocumentCache>,
}

impl fmt::Debug for SwaggerProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategies: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("SwaggerProvider")
            .field("routes", &self.routes.routes.len())
            .field("strategies", &strategies)
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish()
    }
}

impl SwaggerProvider {
    pub(crate) fn new(
        routes: RouteTable,
        strategies: Vec<Arc<dyn DiscoveryStrategy>>,
        settings: DocsSettings,
        enable_cache: bool,
    ) -> Self {
        Self {
            routes,
            strategies,
            settings,
            cache: enable_cache.then(DocumentCache::new),
        }
    }

    /// Candidate operations from every strategy over every route.
    #[must_use]
    pub fn discover(&self) -> Vec<CandidateOperation> {
        discover_all(&self.strategies, &self.routes)
    }

    /// Assemble a fresh document, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedConflict`](crate::Error::UnresolvedConflict)
    /// when operations collide and the resolver picks none, and
    /// [`Error::Filter`](crate::Error::Filter) when a filter fails.
    pub fn generate(&self) -> Result<Document> {
        let candidates = self.discover();
        assemble(&candidates, &self.settings)
    }

    /// The document, served from the cache when caching is enabled.
    ///
    /// # Errors
    ///
    /// Same as [`generate`](Self::generate). Failures are not cached.
    pub fn document(&self) -> Result<Arc<Document>> {
        match &self.cache {
            Some(cache) => cache.get_or_try_init(|| self.generate()),
            None => self.generate().map(Arc::new),
        }
    }

    /// Drop the cached document, if any.
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }
    }

    /// Whether caching is enabled.
    #[must_use]
    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// The route table this provider describes.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The type reflector in use.
    #[must_use]
    pub fn reflector(&self) -> &TypeReflector {
        self.settings.reflector()
    }

    /// Resolved assembly settings.
    #[must_use]
    pub fn settings(&self) -> &DocsSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocsConfig;
    use crate::descriptor::{MemberDescriptor, TypeDescriptor};
    use crate::model::{Capabilities, EdmModel, EntitySet, ODataRoute};

    fn routes() -> RouteTable {
        let supplier = TypeDescriptor::composite(
            "Sample.Supplier",
            vec![MemberDescriptor::new("Id", TypeDescriptor::int64())],
        );
        RouteTable {
            routes: vec![ODataRoute {
                name: "odata".to_string(),
                prefix: "odata".to_string(),
                model: EdmModel {
                    namespace: Some("Default".to_string()),
                    entity_sets: vec![EntitySet {
                        name: "Suppliers".to_string(),
                        entity_type: supplier,
                        keys: vec!["Id".to_string()],
                        capabilities: Capabilities::default(),
                    }],
                    operations: Vec::new(),
                },
                controllers: Vec::new(),
            }],
        }
    }

    #[test]
    fn uncached_provider_assembles_every_time() {
        let provider = DocsConfig::new().build(routes());
        assert!(!provider.is_caching());
        let a = provider.document().unwrap();
        let b = provider.document().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn cached_provider_reuses_until_invalidated() {
        let provider = DocsConfig::new().enable_cache(true).build(routes());
        let a = provider.document().unwrap();
        let b = provider.document().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        provider.invalidate_cache();
        let c = provider.document().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a, c);
    }

    #[test]
    fn model_candidates_come_first() {
        let provider = DocsConfig::new().build(routes());
        let candidates = provider.discover();
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|c| c.source == crate::discover::DiscoverySource::Model));
        assert!(provider.reflector().find_type("Sample.Supplier").is_ok());
    }
}
