//! Generation configuration: the programmatic [`DocsConfig`] builder and the
//! file-based [`ProjectConfig`].
//!
//! # File format
//!
//! ```yaml
//! # api/odata-swagger.yaml
//! title: Sample API
//! version: v1
//! host: api.example.com
//! base_path: /
//! schemes: [https]
//!
//! # Describe navigation properties in entity definitions.
//! include_navigation_properties: false
//!
//! # Compute the document once and serve it until invalidated.
//! enable_cache: true
//!
//! # data_member (alias, else declared name) | declared
//! property_naming: data_member
//!
//! # reject | prefer_model | prefer_attribute | prefer_custom | first
//! conflict_policy: reject
//!
//! # Type full name → schema, checked before any other mapping.
//! custom_schema_mappings:
//!   System.Decimal: { type: number, format: decimal }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::assemble::{ConflictResolver, FirstDiscovered, PreferSource, RejectConflicts};
use crate::bind::{BindStrategy, ParameterBinder};
use crate::discover::{
    AttributeStrategy, CustomRoute, CustomStrategy, DiscoverySource, DiscoveryStrategy,
    ModelStrategy,
};
use crate::document::Info;
use crate::filter::{DocumentFilter, EnableQueryFilter, OperationFilter};
use crate::model::RouteTable;
use crate::provider::SwaggerProvider;
use crate::reflect::{
    DataMemberResolver, DeclaredNameResolver, PropertyResolver, StaticTypeSource, TypeReflector,
    TypeSource,
};
use crate::schema::Schema;

/// Full name of the high-precision decimal type.
pub const DECIMAL_TYPE: &str = "System.Decimal";

/// Project-level generation config.
///
/// Loaded from a YAML file via [`ProjectConfig::load`], then applied to a
/// [`DocsConfig`] via [`DocsConfig::with_project_config`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Document title.
    pub title: Option<String>,

    /// Document version.
    pub version: Option<String>,

    /// Document description.
    pub description: Option<String>,

    /// Host (and optional port) serving the API.
    pub host: Option<String>,

    /// Base path prepended to every path.
    pub base_path: Option<String>,

    /// Transfer schemes.
    pub schemes: Vec<String>,

    /// Describe navigation properties in entity definitions.
    pub include_navigation_properties: bool,

    /// Cache the assembled document.
    pub enable_cache: bool,

    /// Member naming policy.
    pub property_naming: PropertyNaming,

    /// How conflicting operations on one path and verb are resolved.
    pub conflict_policy: ConflictPolicy,

    /// Type full name → schema overrides.
    pub custom_schema_mappings: IndexMap<String, Schema>,
}

impl ProjectConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }
}

/// Member naming policy selectable from config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyNaming {
    /// Serialization alias when present, else the declared name.
    #[default]
    DataMember,
    /// Always the declared name.
    Declared,
}

impl PropertyNaming {
    fn resolver(self) -> Arc<dyn PropertyResolver> {
        match self {
            Self::DataMember => Arc::new(DataMemberResolver),
            Self::Declared => Arc::new(DeclaredNameResolver),
        }
    }
}

/// Conflict resolution policy selectable from config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail generation.
    #[default]
    Reject,
    /// Keep the metadata-model operation.
    PreferModel,
    /// Keep the attribute-routed operation.
    PreferAttribute,
    /// Keep the custom-route operation.
    PreferCustom,
    /// Keep the first discovered operation.
    First,
}

impl ConflictPolicy {
    fn resolver(self) -> Arc<dyn ConflictResolver> {
        match self {
            Self::Reject => Arc::new(RejectConflicts),
            Self::PreferModel => Arc::new(PreferSource(DiscoverySource::Model)),
            Self::PreferAttribute => Arc::new(PreferSource(DiscoverySource::Attribute)),
            Self::PreferCustom => Arc::new(PreferSource(DiscoverySource::Custom)),
            Self::First => Arc::new(FirstDiscovered),
        }
    }
}

/// Builder for a [`SwaggerProvider`].
///
/// Starts from the defaults: `System.Decimal` described as
/// `{type: number, format: decimal}`, navigation properties excluded,
/// caching off, conflicts rejected, and [`EnableQueryFilter`] running after
/// every caller operation filter.
///
/// # Example
///
/// ```ignore
/// let provider = DocsConfig::new()
///     .info("Sample API", "v1")
///     .host("api.example.com")
///     .enable_cache(true)
///     .conflict_resolver(PreferSource(DiscoverySource::Attribute))
///     .build(routes);
/// let document = provider.document()?;
/// ```
pub struct DocsConfig {
    info: Info,
    host: Option<String>,
    base_path: Option<String>,
    schemes: Vec<String>,
    include_navigation_properties: bool,
    enable_cache: bool,
    custom_mappings: IndexMap<String, Schema>,
    property_resolver: Arc<dyn PropertyResolver>,
    type_sources: Option<Vec<Arc<dyn TypeSource>>>,
    operation_filters: Vec<Arc<dyn OperationFilter>>,
    document_filters: Vec<Arc<dyn DocumentFilter>>,
    conflict_resolver: Arc<dyn ConflictResolver>,
    discovery_strategies: Vec<Arc<dyn DiscoveryStrategy>>,
    bind_strategies: Vec<Arc<dyn BindStrategy>>,
    custom_routes: Vec<CustomRoute>,
}

impl fmt::Debug for DocsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocsConfig")
            .field("info", &self.info)
            .field("host", &self.host)
            .field("base_path", &self.base_path)
            .field("include_navigation_properties", &self.include_navigation_properties)
            .field("enable_cache", &self.enable_cache)
            .field("custom_mappings", &self.custom_mappings.keys().collect::<Vec<_>>())
            .field("conflict_resolver", &self.conflict_resolver.name())
            .field("custom_routes", &self.custom_routes.len())
            .finish_non_exhaustive()
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocsConfig {
    /// Config with the default policies.
    #[must_use]
    pub fn new() -> Self {
        let mut custom_mappings = IndexMap::new();
        custom_mappings.insert(
            DECIMAL_TYPE.to_string(),
            Schema::primitive("number", Some("decimal")),
        );
        Self {
            info: Info::default(),
            host: None,
            base_path: None,
            schemes: Vec::new(),
            include_navigation_properties: false,
            enable_cache: false,
            custom_mappings,
            property_resolver: Arc::new(DataMemberResolver),
            type_sources: None,
            operation_filters: Vec::new(),
            document_filters: Vec::new(),
            conflict_resolver: Arc::new(RejectConflicts),
            discovery_strategies: Vec::new(),
            bind_strategies: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Apply settings from a [`ProjectConfig`].
    ///
    /// Builder methods called after this override config values.
    #[must_use]
    pub fn with_project_config(mut self, project: &ProjectConfig) -> Self {
        if let Some(title) = &project.title {
            self.info.title.clone_from(title);
        }
        if let Some(version) = &project.version {
            self.info.version.clone_from(version);
        }
        if project.description.is_some() {
            self.info.description.clone_from(&project.description);
        }
        if project.host.is_some() {
            self.host.clone_from(&project.host);
        }
        if project.base_path.is_some() {
            self.base_path.clone_from(&project.base_path);
        }
        if !project.schemes.is_empty() {
            self.schemes.clone_from(&project.schemes);
        }
        self.include_navigation_properties = project.include_navigation_properties;
        self.enable_cache = project.enable_cache;
        self.property_resolver = project.property_naming.resolver();
        self.conflict_resolver = project.conflict_policy.resolver();
        for (type_name, schema) in &project.custom_schema_mappings {
            self.custom_mappings
                .insert(type_name.clone(), schema.clone());
        }
        self
    }

    /// Set the document title and version.
    #[must_use]
    pub fn info(mut self, title: &str, version: &str) -> Self {
        self.info.title = title.to_string();
        self.info.version = version.to_string();
        self
    }

    /// Set the document description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.info.description = Some(description.to_string());
        self
    }

    /// Set the host.
    #[must_use]
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the base path.
    #[must_use]
    pub fn base_path(mut self, base_path: &str) -> Self {
        self.base_path = Some(base_path.to_string());
        self
    }

    /// Set the transfer schemes.
    #[must_use]
    pub fn schemes(mut self, schemes: &[&str]) -> Self {
        self.schemes = schemes.iter().map(ToString::to_string).collect();
        self
    }

    /// Describe navigation properties in entity definitions.
    #[must_use]
    pub fn include_navigation_properties(mut self, enabled: bool) -> Self {
        self.include_navigation_properties = enabled;
        self
    }

    /// Cache the assembled document until invalidated.
    #[must_use]
    pub fn enable_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    /// Describe the type named `type_full_name` as `schema`, overriding
    /// every other mapping (including an earlier one for the same type).
    #[must_use]
    pub fn custom_schema_mapping(mut self, type_full_name: &str, schema: Schema) -> Self {
        self.custom_mappings
            .insert(type_full_name.to_string(), schema);
        self
    }

    /// Replace the member naming policy.
    #[must_use]
    pub fn property_resolver(mut self, resolver: impl PropertyResolver + 'static) -> Self {
        self.property_resolver = Arc::new(resolver);
        self
    }

    /// Replace where loaded types come from (defaults to the types
    /// reachable from the route table).
    #[must_use]
    pub fn type_sources(mut self, sources: Vec<Arc<dyn TypeSource>>) -> Self {
        self.type_sources = Some(sources);
        self
    }

    /// Append an operation filter. Caller filters run in registration
    /// order, before the built-in query-options filter.
    #[must_use]
    pub fn operation_filter(mut self, filter: impl OperationFilter + 'static) -> Self {
        self.operation_filters.push(Arc::new(filter));
        self
    }

    /// Append a document filter.
    #[must_use]
    pub fn document_filter(mut self, filter: impl DocumentFilter + 'static) -> Self {
        self.document_filters.push(Arc::new(filter));
        self
    }

    /// Replace the conflict resolver.
    #[must_use]
    pub fn conflict_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.conflict_resolver = Arc::new(resolver);
        self
    }

    /// Append a discovery strategy after the built-in ones.
    #[must_use]
    pub fn discovery_strategy(mut self, strategy: impl DiscoveryStrategy + 'static) -> Self {
        self.discovery_strategies.push(Arc::new(strategy));
        self
    }

    /// Append a binding strategy after the built-in named strategies and
    /// before the default binding.
    #[must_use]
    pub fn bind_strategy(mut self, strategy: impl BindStrategy + 'static) -> Self {
        self.bind_strategies.push(Arc::new(strategy));
        self
    }

    /// Register a custom route.
    #[must_use]
    pub fn custom_route(mut self, route: CustomRoute) -> Self {
        self.custom_routes.push(route);
        self
    }

    /// Build a provider serving documents for `routes`.
    #[must_use]
    pub fn build(self, routes: RouteTable) -> SwaggerProvider {
        let type_sources = self.type_sources.unwrap_or_else(|| {
            vec![Arc::new(StaticTypeSource::from_route_table(&routes)) as Arc<dyn TypeSource>]
        });

        let mut strategies: Vec<Arc<dyn DiscoveryStrategy>> = vec![
            Arc::new(ModelStrategy),
            Arc::new(CustomStrategy::new(self.custom_routes)),
            Arc::new(AttributeStrategy),
        ];
        strategies.extend(self.discovery_strategies);

        let mut operation_filters = self.operation_filters;
        operation_filters.push(Arc::new(EnableQueryFilter));

        let settings = DocsSettings {
            info: self.info,
            host: self.host,
            base_path: self.base_path,
            schemes: self.schemes,
            include_navigation_properties: self.include_navigation_properties,
            custom_mappings: self.custom_mappings,
            reflector: TypeReflector::new(self.property_resolver, type_sources),
            binder: ParameterBinder::new(self.bind_strategies),
            operation_filters,
            document_filters: self.document_filters,
            conflict_resolver: self.conflict_resolver,
        };
        SwaggerProvider::new(routes, strategies, settings, self.enable_cache)
    }
}

/// Resolved assembly settings owned by one provider.
pub struct DocsSettings {
    pub(crate) info: Info,
    pub(crate) host: Option<String>,
    pub(crate) base_path: Option<String>,
    pub(crate) schemes: Vec<String>,
    pub(crate) include_navigation_properties: bool,
    pub(crate) custom_mappings: IndexMap<String, Schema>,
    pub(crate) reflector: TypeReflector,
    pub(crate) binder: ParameterBinder,
    pub(crate) operation_filters: Vec<Arc<dyn OperationFilter>>,
    pub(crate) document_filters: Vec<Arc<dyn DocumentFilter>>,
    pub(crate) conflict_resolver: Arc<dyn ConflictResolver>,
}

impl fmt::Debug for DocsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation_filters: Vec<&str> =
            self.operation_filters.iter().map(|x| x.name()).collect();
        let document_filters: Vec<&str> = self.document_filters.iter().map(|x| x.name()).collect();
        f.debug_struct("DocsSettings")
            .field("info", &self.info)
            .field("host", &self.host)
            .field("include_navigation_properties", &self.include_navigation_properties)
            .field("reflector", &self.reflector)
            .field("binder", &self.binder)
            .field("operation_filters", &operation_filters)
            .field("document_filters", &document_filters)
            .field("conflict_resolver", &self.conflict_resolver.name())
            .finish_non_exhaustive()
    }
}

impl DocsSettings {
    /// The type reflector (naming and type-loading policies).
    #[must_use]
    pub fn reflector(&self) -> &TypeReflector {
        &self.reflector
    }

    /// Registered operation filter names, in run order.
    #[must_use]
    pub fn operation_filter_names(&self) -> Vec<&str> {
        self.operation_filters.iter().map(|f| f.name()).collect()
    }

    /// Custom schema mappings, in registration order.
    #[must_use]
    pub fn custom_mappings(&self) -> &IndexMap<String, Schema> {
        &self.custom_mappings
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::descriptor::{MemberDescriptor, TypeDescriptor};

    #[test]
    fn deserialize_defaults() {
        let config: ProjectConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert!(config.title.is_none());
        assert!(config.schemes.is_empty());
        assert!(!config.include_navigation_properties);
        assert!(!config.enable_cache);
        assert_eq!(config.property_naming, PropertyNaming::DataMember);
        assert_eq!(config.conflict_policy, ConflictPolicy::Reject);
        assert!(config.custom_schema_mappings.is_empty());
    }

    #[test]
    fn deserialize_full() {
        let yaml = r"
title: Sample API
version: v2
host: api.example.com
base_path: /
schemes: [https]
include_navigation_properties: true
enable_cache: true
property_naming: declared
conflict_policy: prefer_attribute
custom_schema_mappings:
  System.Guid: { type: string, format: guid }
";
        let config: ProjectConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.title.as_deref(), Some("Sample API"));
        assert_eq!(config.version.as_deref(), Some("v2"));
        assert_eq!(config.host.as_deref(), Some("api.example.com"));
        assert_eq!(config.schemes, vec!["https"]);
        assert!(config.include_navigation_properties);
        assert!(config.enable_cache);
        assert_eq!(config.property_naming, PropertyNaming::Declared);
        assert_eq!(config.conflict_policy, ConflictPolicy::PreferAttribute);
        assert_eq!(
            config.custom_schema_mappings["System.Guid"],
            Schema::primitive("string", Some("guid"))
        );
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result: Result<ProjectConfig, _> = serde_yaml_ng::from_str("conflict_policy: newest");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join("odata-swagger-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "title: From File\nenable_cache: true\n").unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.title.as_deref(), Some("From File"));
        assert!(config.enable_cache);
        // Defaults still apply
        assert_eq!(config.conflict_policy, ConflictPolicy::Reject);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_nonexistent_file_returns_error() {
        let result = ProjectConfig::load(Path::new("/nonexistent/odata-swagger.yaml"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }

    #[test]
    fn load_invalid_yaml_returns_error() {
        let dir = std::env::temp_dir().join("odata-swagger-config-test-invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.yaml");
        std::fs::write(&path, "schemes: [[[invalid").unwrap();

        let result = ProjectConfig::load(&path);
        assert!(matches!(result, Err(crate::Error::Yaml(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn defaults_map_decimal_and_append_query_filter() {
        let provider = DocsConfig::new()
            .operation_filter(crate::filter::FnFilter::operation("mine", |_op| {
                Ok(crate::filter::FilterOutcome::Keep)
            }))
            .build(RouteTable::default());
        let settings = provider.settings();
        assert_eq!(
            settings.custom_mappings()[DECIMAL_TYPE],
            Schema::primitive("number", Some("decimal"))
        );
        assert_eq!(settings.operation_filter_names(), vec!["mine", "enable-query"]);
    }

    #[test]
    fn project_config_applies_then_builder_overrides() {
        let project = ProjectConfig {
            title: Some("From File".to_string()),
            host: Some("file.example.com".to_string()),
            property_naming: PropertyNaming::Declared,
            ..ProjectConfig::default()
        };
        let provider = DocsConfig::new()
            .with_project_config(&project)
            .host("override.example.com")
            .build(RouteTable::default());
        let settings = provider.settings();
        assert_eq!(settings.info.title, "From File");
        assert_eq!(settings.host.as_deref(), Some("override.example.com"));

        let member =
            MemberDescriptor::new("Description", TypeDescriptor::string()).alias("Something");
        assert_eq!(settings.reflector().property_name(&member), "Description");
    }
}
