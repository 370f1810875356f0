//! Type descriptor → schema conversion with a per-pass definitions registry.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::{primitive_schema, Schema};
use crate::descriptor::{MemberDescriptor, TypeDescriptor, TypeKind};
use crate::reflect::{self, TypeReflector};

/// Builds schemas for one document-assembly pass.
///
/// Named records are registered in the definitions table the first time
/// they are seen and referenced by `$ref` afterwards, so building the same
/// type twice yields the same reference and a single definition.
#[derive(Debug)]
pub struct SchemaBuilder<'a> {
    reflector: &'a TypeReflector,
    custom_mappings: &'a IndexMap<String, Schema>,
    include_navigation_properties: bool,
    /// Full type name → definition id.
    ids: HashMap<String, String>,
    definitions: IndexMap<String, Schema>,
    /// References already reported as unresolvable.
    unresolved: HashSet<String>,
    /// Loaded types by full name, read from the reflector on first use.
    loaded_types: Option<IndexMap<String, TypeDescriptor>>,
}

impl<'a> SchemaBuilder<'a> {
    /// Builder with an empty definitions table.
    #[must_use]
    pub fn new(
        reflector: &'a TypeReflector,
        custom_mappings: &'a IndexMap<String, Schema>,
        include_navigation_properties: bool,
    ) -> Self {
        Self {
            reflector,
            custom_mappings,
            include_navigation_properties,
            ids: HashMap::new(),
            definitions: IndexMap::new(),
            unresolved: HashSet::new(),
            loaded_types: None,
        }
    }

    /// Schema for `ty`.
    ///
    /// A custom mapping registered for the exact full name wins over
    /// everything else.
    pub fn build(&mut self, ty: &TypeDescriptor) -> Schema {
        if let Some(schema) = self.custom_mappings.get(&ty.full_name()) {
            return schema.clone();
        }
        if let Some(element) = reflect::collection_element(ty) {
            return Schema::array(self.build(element));
        }

        match &ty.kind {
            TypeKind::Primitive { primitive } => primitive_schema(*primitive),
            TypeKind::Enum { members } => Schema::string_enum(members.clone()),
            TypeKind::Nullable { inner } => self.build(inner),
            TypeKind::Array { element } => Schema::array(self.build(element)),
            TypeKind::Composite { .. } => self.register(ty),
            TypeKind::Inline { members } => self.object_schema(members),
            TypeKind::Reference { full_name } => self.resolve_reference(full_name),
            TypeKind::Generic { .. } => {
                let inner = reflect::unwrap_transparent(ty);
                if std::ptr::eq(inner, ty) {
                    tracing::debug!(
                        type_name = %ty.full_name(),
                        "no schema mapping for generic type, using object"
                    );
                    Schema::object()
                } else {
                    self.build(inner)
                }
            }
        }
    }

    /// Named definitions registered so far, in first-seen order.
    #[must_use]
    pub fn definitions(&self) -> &IndexMap<String, Schema> {
        &self.definitions
    }

    /// Consume the builder, yielding the definitions table.
    #[must_use]
    pub fn into_definitions(self) -> IndexMap<String, Schema> {
        self.definitions
    }

    fn register(&mut self, ty: &TypeDescriptor) -> Schema {
        let full_name = ty.full_name();
        if let Some(id) = self.ids.get(&full_name) {
            return Schema::reference(id);
        }

        let id = self.allocate_id(&ty.name, &full_name);
        self.ids.insert(full_name, id.clone());
        // Reserve the slot before recursing so self-references terminate
        // and parents precede their members in the table.
        self.definitions.insert(id.clone(), Schema::object());
        let schema = self.object_schema(ty.members());
        self.definitions.insert(id.clone(), schema);
        Schema::reference(&id)
    }

    fn allocate_id(&self, name: &str, full_name: &str) -> String {
        if !self.definitions.contains_key(name) {
            return name.to_string();
        }
        if !self.definitions.contains_key(full_name) {
            return full_name.to_string();
        }
        (2..)
            .map(|n| format!("{full_name}{n}"))
            .find(|id| !self.definitions.contains_key(id))
            .unwrap_or_else(|| full_name.to_string())
    }

    fn resolve_reference(&mut self, full_name: &str) -> Schema {
        if let Some(id) = self.ids.get(full_name) {
            return Schema::reference(id);
        }
        if self.unresolved.contains(full_name) {
            return Schema::object();
        }

        let found = self
            .loaded_types
            .get_or_insert_with(|| self.reflector.type_index())
            .get(full_name)
            .cloned();
        match found {
            Some(ty) if !matches!(ty.kind, TypeKind::Reference { .. }) => self.build(&ty),
            Some(_) => {
                tracing::warn!(
                    type_name = full_name,
                    "type reference resolves to another reference, using object"
                );
                self.unresolved.insert(full_name.to_string());
                Schema::object()
            }
            None => {
                tracing::warn!(type_name = full_name, "unresolved type reference, using object");
                self.unresolved.insert(full_name.to_string());
                Schema::object()
            }
        }
    }

    fn object_schema(&mut self, members: &[MemberDescriptor]) -> Schema {
        let mut schema = Schema::object();
        for member in members {
            if member.navigation && !self.include_navigation_properties {
                continue;
            }
            let name = self.reflector.property_name(member);
            if schema.properties.contains_key(&name) {
                tracing::warn!(property = %name, "duplicate property name, keeping the first");
                continue;
            }
            let property = self.build(&member.ty);
            if !member.optional && !reflect::is_nullable(&member.ty) {
                schema.required.push(name.clone());
            }
            schema.properties.insert(name, property);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::descriptor::Primitive;
    use crate::reflect::{DeclaredNameResolver, StaticTypeSource, TypeLoadError, TypeSource};

    fn supplier() -> TypeDescriptor {
        TypeDescriptor::composite(
            "Sample.Models.Supplier",
            vec![
                MemberDescriptor::new("Id", TypeDescriptor::int64()),
                MemberDescriptor::new("Name", TypeDescriptor::string()),
                MemberDescriptor::new("Description", TypeDescriptor::string())
                    .alias("Something")
                    .optional(),
                MemberDescriptor::new(
                    "Products",
                    TypeDescriptor::list(TypeDescriptor::reference("Sample.Models.Product")),
                )
                .navigation(),
            ],
        )
    }

    #[test]
    fn composite_registers_once() {
        let reflector = TypeReflector::default();
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let first = builder.build(&supplier());
        let second = builder.build(&supplier());
        assert_eq!(first, second);
        assert_eq!(first.reference_name(), Some("Supplier"));
        assert_eq!(builder.definitions().len(), 1);

        let definition = &builder.definitions()["Supplier"];
        let names: Vec<&str> = definition.properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Id", "Name", "Something"]);
        assert_eq!(definition.required, vec!["Id", "Name"]);
    }

    #[test]
    fn navigation_properties_included_on_request() {
        let reflector = TypeReflector::new(
            Arc::new(DeclaredNameResolver),
            vec![Arc::new(StaticTypeSource::new(
                "models",
                vec![TypeDescriptor::composite(
                    "Sample.Models.Product",
                    vec![MemberDescriptor::new("Id", TypeDescriptor::int32())],
                )],
            ))],
        );
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, true);
        builder.build(&supplier());

        let definition = &builder.definitions()["Supplier"];
        assert!(definition.properties.contains_key("Description"));
        let products = &definition.properties["Products"];
        assert!(products.is_array());
        assert_eq!(
            products.items.as_ref().unwrap().reference_name(),
            Some("Product")
        );
        assert!(builder.definitions().contains_key("Product"));
    }

    #[test]
    fn enum_lists_member_names_in_order() {
        let reflector = TypeReflector::default();
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let schema = builder.build(&TypeDescriptor::enumeration(
            "Sample.Color",
            &["Red", "Green", "Blue"],
        ));
        assert_eq!(schema.schema_type.as_deref(), Some("string"));
        assert_eq!(schema.enum_values, vec!["Red", "Green", "Blue"]);
    }

    #[test]
    fn custom_mapping_wins() {
        let reflector = TypeReflector::default();
        let mut mappings = IndexMap::new();
        mappings.insert(
            "System.Decimal".to_string(),
            Schema::primitive("number", Some("decimal")),
        );
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let schema = builder.build(&TypeDescriptor::nullable(TypeDescriptor::primitive(
            Primitive::Decimal,
        )));
        assert_eq!(schema, Schema::primitive("number", Some("decimal")));
    }

    #[test]
    fn same_short_name_in_two_namespaces_gets_distinct_ids() {
        let reflector = TypeReflector::default();
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let v1 = builder.build(&TypeDescriptor::composite("V1.Customer", Vec::new()));
        let v2 = builder.build(&TypeDescriptor::composite("V2.Customer", Vec::new()));
        assert_eq!(v1.reference_name(), Some("Customer"));
        assert_eq!(v2.reference_name(), Some("V2.Customer"));
    }

    #[test]
    fn self_reference_terminates() {
        let node = TypeDescriptor::composite(
            "Sample.Node",
            vec![MemberDescriptor::new(
                "Parent",
                TypeDescriptor::reference("Sample.Node"),
            )
            .optional()],
        );
        let reflector = TypeReflector::new(
            Arc::new(crate::reflect::DataMemberResolver),
            vec![Arc::new(StaticTypeSource::new("models", vec![node.clone()]))],
        );
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let schema = builder.build(&node);
        assert_eq!(schema.reference_name(), Some("Node"));
        assert_eq!(
            builder.definitions()["Node"].properties["Parent"].reference_name(),
            Some("Node")
        );
    }

    #[test]
    #[traced_test]
    fn unresolved_reference_degrades_to_object() {
        let reflector = TypeReflector::default();
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let schema = builder.build(&TypeDescriptor::reference("Sample.Missing"));
        assert_eq!(schema, Schema::object());
        assert!(logs_contain("unresolved type reference"));
    }

    struct CountingSource {
        loads: AtomicUsize,
        types: Vec<TypeDescriptor>,
    }

    impl TypeSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn load_types(&self) -> Result<Vec<TypeDescriptor>, TypeLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.types.clone())
        }
    }

    #[test]
    fn types_loaded_once_per_pass() {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
            types: vec![
                TypeDescriptor::composite("Sample.Product", Vec::new()),
                TypeDescriptor::composite("Sample.Category", Vec::new()),
            ],
        });
        let reflector = TypeReflector::new(
            Arc::new(crate::reflect::DataMemberResolver),
            vec![Arc::clone(&source) as Arc<dyn TypeSource>],
        );
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        builder.build(&TypeDescriptor::composite(
            "Sample.Order",
            vec![
                MemberDescriptor::new("Product", TypeDescriptor::reference("Sample.Product")),
                MemberDescriptor::new("Category", TypeDescriptor::reference("Sample.Category")),
                MemberDescriptor::new("Missing", TypeDescriptor::reference("Sample.Missing")),
            ],
        ));
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
        assert!(builder.definitions().contains_key("Product"));
        assert!(builder.definitions().contains_key("Category"));
    }

    #[test]
    fn task_unwraps_to_inner_type() {
        let reflector = TypeReflector::default();
        let mappings = IndexMap::new();
        let mut builder = SchemaBuilder::new(&reflector, &mappings, false);

        let ty =
            TypeDescriptor::generic("System.Threading.Tasks.Task", vec![TypeDescriptor::int32()]);
        assert_eq!(builder.build(&ty), primitive_schema(Primitive::Int32));
    }
}
