//! Structural type questions and the two swappable type policies.
//!
//! The free functions answer shape questions about a single
//! [`TypeDescriptor`] (collection element, nullability, enums, query
//! primitives). [`TypeReflector`] owns the policies that vary per
//! configuration: how member names are resolved ([`PropertyResolver`]) and
//! where the set of loaded types comes from ([`TypeSource`]). Each
//! [`SwaggerProvider`](crate::SwaggerProvider) owns its own reflector, so
//! swapping a policy never leaks into another configuration.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::{MemberDescriptor, Primitive, TypeDescriptor, TypeKind, ENUMERABLE};
use crate::error::{Error, Result};
use crate::model::RouteTable;

/// Generic wrappers whose single argument is the type callers care about.
const TRANSPARENT_WRAPPERS: &[&str] = &["Task", "ValueTask", "SingleResult", "Delta"];

/// Element type when `ty` is a collection.
///
/// Strings are never collections even though they enumerate characters.
/// Arrays yield their element type. Otherwise the first single-argument
/// `IEnumerable<T>` among the declared interfaces, then the type itself,
/// wins; several enumerable interfaces with different element types are
/// not disambiguated beyond that order.
#[must_use]
pub fn collection_element(ty: &TypeDescriptor) -> Option<&TypeDescriptor> {
    match &ty.kind {
        TypeKind::Primitive {
            primitive: Primitive::String,
        } => return None,
        TypeKind::Array { element } => return Some(element),
        _ => {}
    }

    ty.interfaces
        .iter()
        .chain(std::iter::once(ty))
        .find_map(enumerable_argument)
}

fn enumerable_argument(ty: &TypeDescriptor) -> Option<&TypeDescriptor> {
    match &ty.kind {
        TypeKind::Generic {
            definition,
            arguments,
        } if definition == ENUMERABLE && arguments.len() == 1 => arguments.first(),
        _ => None,
    }
}

/// Whether `ty` is a collection (see [`collection_element`]).
#[must_use]
pub fn is_collection(ty: &TypeDescriptor) -> bool {
    collection_element(ty).is_some()
}

/// Whether `ty` is a nullable wrapper.
#[must_use]
pub fn is_nullable(ty: &TypeDescriptor) -> bool {
    matches!(ty.kind, TypeKind::Nullable { .. })
}

/// The type itself, or the wrapped type of a nullable.
#[must_use]
pub fn underlying_type_or_self(ty: &TypeDescriptor) -> &TypeDescriptor {
    match &ty.kind {
        TypeKind::Nullable { inner } => inner,
        _ => ty,
    }
}

/// Whether `ty` (or the type it makes nullable) is an enum.
#[must_use]
pub fn is_enum(ty: &TypeDescriptor) -> bool {
    matches!(underlying_type_or_self(ty).kind, TypeKind::Enum { .. })
}

/// Unwrap nullables and collections until a fixed point.
///
/// Terminates because descriptors are finite trees; records that refer to
/// themselves do so through [`TypeKind::Reference`], which is not a wrapper.
#[must_use]
pub fn innermost_element_type(ty: &TypeDescriptor) -> &TypeDescriptor {
    let mut current = ty;
    loop {
        if let TypeKind::Nullable { inner } = &current.kind {
            current = inner;
            continue;
        }
        match collection_element(current) {
            Some(element) => current = element,
            None => return current,
        }
    }
}

/// Whether values of `ty` can travel in a query string: primitives, enums
/// and the well-known value types, judged on the innermost element type.
#[must_use]
pub fn is_query_primitive(ty: &TypeDescriptor) -> bool {
    matches!(
        innermost_element_type(ty).kind,
        TypeKind::Primitive { .. } | TypeKind::Enum { .. }
    )
}

/// Strip async/single-result wrappers (`Task<T>` → `T`), repeatedly.
#[must_use]
pub fn unwrap_transparent(ty: &TypeDescriptor) -> &TypeDescriptor {
    let mut current = ty;
    while let TypeKind::Generic {
        definition,
        arguments,
    } = &current.kind
    {
        match arguments.as_slice() {
            [inner] if TRANSPARENT_WRAPPERS.contains(&definition.as_str()) => current = inner,
            _ => break,
        }
    }
    current
}

/// Resolves the name a member is described under.
pub trait PropertyResolver: Send + Sync {
    /// Name for `member`; `default_name` is the member's declared name.
    fn resolve_name(&self, member: &MemberDescriptor, default_name: &str) -> String;
}

/// Default policy: the explicit serialization alias, else the default name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataMemberResolver;

impl PropertyResolver for DataMemberResolver {
    fn resolve_name(&self, member: &MemberDescriptor, default_name: &str) -> String {
        member
            .alias
            .as_deref()
            .filter(|alias| !alias.trim().is_empty())
            .unwrap_or(default_name)
            .to_string()
    }
}

/// Always the declared identifier, ignoring aliases.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredNameResolver;

impl PropertyResolver for DeclaredNameResolver {
    fn resolve_name(&self, member: &MemberDescriptor, _default_name: &str) -> String {
        member.name.clone()
    }
}

/// Why a [`TypeSource`] could not enumerate all of its types.
#[derive(Debug, thiserror::Error)]
pub enum TypeLoadError {
    /// Some types loaded; the rest failed.
    #[error("partially loaded: {reason}")]
    Partial {
        /// The types that did load.
        loaded: Vec<TypeDescriptor>,
        /// Why the others failed.
        reason: String,
    },

    /// Nothing could be loaded.
    #[error("failed to load types: {reason}")]
    Failed {
        /// Why loading failed.
        reason: String,
    },
}

/// A unit of loadable types (the analogue of an assembly).
pub trait TypeSource: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Every type the source defines.
    ///
    /// # Errors
    ///
    /// Returns [`TypeLoadError`] when some or all types cannot be loaded.
    fn load_types(&self) -> std::result::Result<Vec<TypeDescriptor>, TypeLoadError>;
}

/// A fixed list of types.
#[derive(Debug, Clone)]
pub struct StaticTypeSource {
    name: String,
    types: Vec<TypeDescriptor>,
}

impl StaticTypeSource {
    /// Source named `name` defining `types`.
    #[must_use]
    pub fn new(name: &str, types: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            types,
        }
    }

    /// Every named enum and record reachable from the route table's
    /// models and controllers, first occurrence per full name.
    #[must_use]
    pub fn from_route_table(routes: &RouteTable) -> Self {
        let mut collector = TypeCollector::default();
        for route in &routes.routes {
            for set in &route.model.entity_sets {
                collector.visit(&set.entity_type);
            }
            for op in &route.model.operations {
                for param in &op.parameters {
                    collector.visit(&param.ty);
                }
                if let Some(ty) = &op.return_type {
                    collector.visit(ty);
                }
            }
            for action in route.controllers.iter().flat_map(|c| &c.actions) {
                for param in &action.parameters {
                    collector.visit(&param.ty);
                }
                if let Some(ty) = &action.return_type {
                    collector.visit(ty);
                }
            }
        }
        Self::new("route-table", collector.types)
    }
}

impl TypeSource for StaticTypeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_types(&self) -> std::result::Result<Vec<TypeDescriptor>, TypeLoadError> {
        Ok(self.types.clone())
    }
}

#[derive(Default)]
struct TypeCollector {
    types: Vec<TypeDescriptor>,
}

impl TypeCollector {
    fn visit(&mut self, ty: &TypeDescriptor) {
        match &ty.kind {
            TypeKind::Composite { members } => {
                let full_name = ty.full_name();
                if self.types.iter().any(|t| t.full_name() == full_name) {
                    return;
                }
                self.types.push(ty.clone());
                for member in members {
                    self.visit(&member.ty);
                }
            }
            TypeKind::Enum { .. } => {
                let full_name = ty.full_name();
                if !self.types.iter().any(|t| t.full_name() == full_name) {
                    self.types.push(ty.clone());
                }
            }
            TypeKind::Inline { members } => {
                for member in members {
                    self.visit(&member.ty);
                }
            }
            TypeKind::Nullable { inner } => self.visit(inner),
            TypeKind::Array { element } => self.visit(element),
            TypeKind::Generic { arguments, .. } => {
                for arg in arguments {
                    self.visit(arg);
                }
            }
            TypeKind::Primitive { .. } | TypeKind::Reference { .. } => {}
        }
    }
}

/// Holds the property-naming and type-loading policies for one configuration.
#[derive(Clone)]
pub struct TypeReflector {
    property_resolver: Arc<dyn PropertyResolver>,
    type_sources: Vec<Arc<dyn TypeSource>>,
}

impl fmt::Debug for TypeReflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.type_sources.iter().map(|s| s.name()).collect();
        f.debug_struct("TypeReflector")
            .field("type_sources", &sources)
            .finish_non_exhaustive()
    }
}

impl Default for TypeReflector {
    fn default() -> Self {
        Self::new(Arc::new(DataMemberResolver), Vec::new())
    }
}

impl TypeReflector {
    /// Reflector with explicit policies.
    #[must_use]
    pub fn new(
        property_resolver: Arc<dyn PropertyResolver>,
        type_sources: Vec<Arc<dyn TypeSource>>,
    ) -> Self {
        Self {
            property_resolver,
            type_sources,
        }
    }

    /// Name `member` is described under, per the active naming policy.
    #[must_use]
    pub fn property_name(&self, member: &MemberDescriptor) -> String {
        self.property_resolver.resolve_name(member, &member.name)
    }

    /// Every visible type across all sources.
    ///
    /// A partially failing source contributes what it loaded; a failing
    /// source is skipped. Neither aborts the scan.
    #[must_use]
    pub fn loaded_types(&self) -> Vec<TypeDescriptor> {
        let mut result = Vec::new();
        for source in &self.type_sources {
            let types = match source.load_types() {
                Ok(types) => types,
                Err(TypeLoadError::Partial { loaded, reason }) => {
                    tracing::warn!(
                        source = source.name(),
                        %reason,
                        "type source partially loaded"
                    );
                    loaded
                }
                Err(TypeLoadError::Failed { reason }) => {
                    tracing::warn!(source = source.name(), %reason, "skipping type source");
                    continue;
                }
            };
            result.extend(types.into_iter().filter(|t| t.visible));
        }
        result
    }

    /// Loaded types keyed by full name, in load order; the first source
    /// to declare a name wins.
    #[must_use]
    pub fn type_index(&self) -> IndexMap<String, TypeDescriptor> {
        let mut index = IndexMap::new();
        for ty in self.loaded_types() {
            index.entry(ty.full_name()).or_insert(ty);
        }
        index
    }

    /// The loaded type named `full_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeNotFound`] when no loaded type matches.
    pub fn find_type(&self, full_name: &str) -> Result<TypeDescriptor> {
        self.loaded_types()
            .into_iter()
            .find(|t| t.full_name() == full_name)
            .ok_or_else(|| Error::TypeNotFound {
                full_name: full_name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;

    fn supplier() -> TypeDescriptor {
        TypeDescriptor::composite(
            "Sample.Supplier",
            vec![MemberDescriptor::new("Id", TypeDescriptor::int64())],
        )
    }

    #[test]
    fn string_is_not_a_collection() {
        assert!(!is_collection(&TypeDescriptor::string()));
    }

    #[test]
    fn list_and_array_are_collections() {
        let list = TypeDescriptor::list(supplier());
        assert_eq!(collection_element(&list).unwrap().name, "Supplier");

        let array = TypeDescriptor::array(TypeDescriptor::int32());
        assert_eq!(
            collection_element(&array).unwrap().as_primitive(),
            Some(Primitive::Int32)
        );
    }

    #[test]
    fn first_enumerable_interface_wins() {
        let ty = TypeDescriptor::composite("Sample.Multi", Vec::new())
            .with_interface(TypeDescriptor::enumerable(TypeDescriptor::int32()))
            .with_interface(TypeDescriptor::enumerable(TypeDescriptor::string()));
        assert_eq!(
            collection_element(&ty).unwrap().as_primitive(),
            Some(Primitive::Int32)
        );
    }

    #[test]
    fn innermost_unwraps_nested_wrappers() {
        let ty = TypeDescriptor::array(TypeDescriptor::nullable(TypeDescriptor::primitive(
            Primitive::Guid,
        )));
        assert_eq!(
            innermost_element_type(&ty).as_primitive(),
            Some(Primitive::Guid)
        );
        assert!(is_query_primitive(&ty));

        let list = TypeDescriptor::list(TypeDescriptor::nullable(TypeDescriptor::int32()));
        assert_eq!(
            innermost_element_type(&list).as_primitive(),
            Some(Primitive::Int32)
        );
        assert!(is_query_primitive(&list));
    }

    #[test]
    fn records_are_not_query_primitives() {
        assert!(!is_query_primitive(&supplier()));
        assert!(is_query_primitive(&TypeDescriptor::enumeration(
            "Sample.Color",
            &["Red"]
        )));
    }

    #[test]
    fn nullable_enum_is_enum() {
        let ty = TypeDescriptor::nullable(TypeDescriptor::enumeration("Sample.Color", &["Red"]));
        assert!(is_enum(&ty));
        assert!(is_nullable(&ty));
    }

    #[test]
    fn unwrap_transparent_strips_task() {
        let ty = TypeDescriptor::generic("System.Threading.Tasks.Task", vec![supplier()]);
        assert_eq!(unwrap_transparent(&ty).name, "Supplier");
    }

    #[test]
    fn naming_policies() {
        let member =
            MemberDescriptor::new("Description", TypeDescriptor::string()).alias("Something");
        assert_eq!(
            DataMemberResolver.resolve_name(&member, "description"),
            "Something"
        );
        assert_eq!(
            DeclaredNameResolver.resolve_name(&member, "description"),
            "Description"
        );

        let blank = MemberDescriptor::new("Code", TypeDescriptor::string()).alias("  ");
        assert_eq!(DataMemberResolver.resolve_name(&blank, "code"), "code");
    }

    struct FailingSource;

    impl TypeSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn load_types(&self) -> std::result::Result<Vec<TypeDescriptor>, TypeLoadError> {
            Err(TypeLoadError::Failed {
                reason: "dynamic assembly".to_string(),
            })
        }
    }

    struct PartialSource;

    impl TypeSource for PartialSource {
        fn name(&self) -> &str {
            "partial"
        }

        fn load_types(&self) -> std::result::Result<Vec<TypeDescriptor>, TypeLoadError> {
            Err(TypeLoadError::Partial {
                loaded: vec![TypeDescriptor::enumeration("Sample.Color", &["Red"])],
                reason: "missing dependency".to_string(),
            })
        }
    }

    #[test]
    #[traced_test]
    fn failing_sources_do_not_abort_the_scan() {
        let reflector = TypeReflector::new(
            Arc::new(DataMemberResolver),
            vec![
                Arc::new(FailingSource),
                Arc::new(PartialSource),
                Arc::new(StaticTypeSource::new(
                    "static",
                    vec![
                        supplier(),
                        TypeDescriptor::composite("Sample.Hidden", Vec::new()).hidden(),
                    ],
                )),
            ],
        );

        let names: Vec<String> = reflector
            .loaded_types()
            .iter()
            .map(TypeDescriptor::full_name)
            .collect();
        assert_eq!(names, vec!["Sample.Color", "Sample.Supplier"]);
        assert!(logs_contain("skipping type source"));
        assert!(logs_contain("partially loaded"));
    }

    #[test]
    fn type_index_keeps_first_declaration() {
        let reflector = TypeReflector::new(
            Arc::new(DataMemberResolver),
            vec![
                Arc::new(StaticTypeSource::new("first", vec![supplier()])),
                Arc::new(StaticTypeSource::new(
                    "second",
                    vec![
                        TypeDescriptor::composite("Sample.Supplier", Vec::new()),
                        TypeDescriptor::enumeration("Sample.Color", &["Red"]),
                    ],
                )),
            ],
        );
        let index = reflector.type_index();
        let names: Vec<&str> = index.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Sample.Supplier", "Sample.Color"]);
        assert!(!index["Sample.Supplier"].members().is_empty());
    }

    #[test]
    fn find_type_reports_not_found() {
        let reflector = TypeReflector::new(
            Arc::new(DataMemberResolver),
            vec![Arc::new(StaticTypeSource::new("static", vec![supplier()]))],
        );
        assert_eq!(reflector.find_type("Sample.Supplier").unwrap().name, "Supplier");
        assert!(matches!(
            reflector.find_type("Sample.Missing"),
            Err(Error::TypeNotFound { full_name }) if full_name == "Sample.Missing"
        ));
    }

    #[test]
    fn route_table_source_collects_nested_records_once() {
        use crate::model::{EdmModel, EntitySet, ODataRoute};

        let order = TypeDescriptor::composite(
            "Sample.Order",
            vec![MemberDescriptor::new(
                "Status",
                TypeDescriptor::enumeration("Sample.Status", &["Open"]),
            )],
        );
        let customer = TypeDescriptor::composite(
            "Sample.Customer",
            vec![
                MemberDescriptor::new("Orders", TypeDescriptor::list(order.clone())).navigation(),
            ],
        );
        let table = RouteTable {
            routes: vec![ODataRoute {
                name: "odata".to_string(),
                prefix: "odata".to_string(),
                model: EdmModel {
                    namespace: None,
                    entity_sets: vec![
                        EntitySet {
                            name: "Customers".to_string(),
                            entity_type: customer,
                            keys: vec!["Id".to_string()],
                            capabilities: crate::model::Capabilities::default(),
                        },
                        EntitySet {
                            name: "Orders".to_string(),
                            entity_type: order,
                            keys: vec!["Id".to_string()],
                            capabilities: crate::model::Capabilities::default(),
                        },
                    ],
                    operations: Vec::new(),
                },
                controllers: Vec::new(),
            }],
        };

        let source = StaticTypeSource::from_route_table(&table);
        let names: Vec<String> = source
            .load_types()
            .unwrap()
            .iter()
            .map(TypeDescriptor::full_name)
            .collect();
        assert_eq!(names, vec!["Sample.Customer", "Sample.Order", "Sample.Status"]);
    }
}
