//! Schema objects and the type → schema builder.
//!
//! [`Schema`] mirrors the Swagger 2.0 schema object closely enough to
//! serialize directly: a primitive `type`/`format` pair, a `$ref` to a named
//! definition, an `array` with `items`, a string `enum`, or an `object` with
//! ordered `properties` and `required` names.

mod builder;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::Primitive;

pub use builder::SchemaBuilder;

/// Prefix of every `$ref` into the definitions table.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// A structural type description in the output document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// `$ref` to a named definition (`#/definitions/{name}`).
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// JSON type (`string`, `integer`, `number`, `boolean`, `array`, `object`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    /// Format refinement (e.g., `int32`, `date-time`, `uuid`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Item schema of an array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Allowed string values, in declaration order.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    /// Object properties, in member declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    /// Required property names, in member declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Schema {
    /// Primitive schema with an optional format.
    #[must_use]
    pub fn primitive(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: format.map(ToString::to_string),
            ..Self::default()
        }
    }

    /// `$ref` to the definition named `name`.
    #[must_use]
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{DEFINITIONS_PREFIX}{name}")),
            ..Self::default()
        }
    }

    /// Array of `items`.
    #[must_use]
    pub fn array(items: Self) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// String restricted to `values`.
    #[must_use]
    pub fn string_enum(values: Vec<String>) -> Self {
        Self {
            schema_type: Some("string".to_string()),
            enum_values: values,
            ..Self::default()
        }
    }

    /// Object without properties.
    #[must_use]
    pub fn object() -> Self {
        Self::primitive("object", None)
    }

    /// Definition name this schema refers to, if it is a `$ref`.
    #[must_use]
    pub fn reference_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(DEFINITIONS_PREFIX))
    }

    /// Whether this is an array schema.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.schema_type.as_deref() == Some("array")
    }

    /// Call `f` with every definition name referenced by this schema or
    /// any nested schema.
    pub fn visit_references<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        if let Some(name) = self.reference_name() {
            f(name);
        }
        if let Some(items) = &self.items {
            items.visit_references(f);
        }
        for property in self.properties.values() {
            property.visit_references(f);
        }
    }
}

/// Schema of a primitive or well-known value type.
#[must_use]
pub fn primitive_schema(primitive: Primitive) -> Schema {
    let (schema_type, format) = match primitive {
        Primitive::Boolean => ("boolean", None),
        Primitive::Byte | Primitive::SByte | Primitive::Int16 | Primitive::Int32 => {
            ("integer", Some("int32"))
        }
        Primitive::Int64 => ("integer", Some("int64")),
        Primitive::Single => ("number", Some("float")),
        Primitive::Double | Primitive::Decimal => ("number", Some("double")),
        Primitive::String | Primitive::Char | Primitive::TimeOfDay | Primitive::TimeSpan => {
            ("string", None)
        }
        Primitive::DateTime | Primitive::DateTimeOffset => ("string", Some("date-time")),
        Primitive::Date => ("string", Some("date")),
        Primitive::Guid => ("string", Some("uuid")),
        Primitive::Uri => ("string", Some("uri")),
        Primitive::Binary => ("string", Some("byte")),
    };
    Schema::primitive(schema_type, format)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn reference_round_trips_name() {
        let schema = Schema::reference("Supplier");
        assert_eq!(schema.reference.as_deref(), Some("#/definitions/Supplier"));
        assert_eq!(schema.reference_name(), Some("Supplier"));
    }

    #[test]
    fn serializes_only_set_fields() {
        let value = serde_json::to_value(primitive_schema(Primitive::Int32)).unwrap();
        assert_eq!(value, serde_json::json!({"type": "integer", "format": "int32"}));

        let value = serde_json::to_value(Schema::array(Schema::reference("Supplier"))).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "array", "items": {"$ref": "#/definitions/Supplier"}})
        );
    }

    #[test]
    fn visit_references_walks_nested_schemas() {
        let mut object = Schema::object();
        object
            .properties
            .insert("a".to_string(), Schema::array(Schema::reference("A")));
        object
            .properties
            .insert("b".to_string(), Schema::reference("B"));

        let mut seen = Vec::new();
        object.visit_references(&mut |name| seen.push(name));
        assert_eq!(seen, vec!["A", "B"]);
    }
}
