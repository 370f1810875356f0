//! The Swagger 2.0 output document.
//!
//! Paths and definitions are [`IndexMap`]s so output order follows
//! discovery order and member declaration order, making generated files
//! stable across runs.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;
use crate::schema::Schema;
use crate::HttpVerb;

/// Swagger version emitted in every document.
pub const SWAGGER_VERSION: &str = "2.0";

/// JSON media type used for request bodies and responses.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// A complete API description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Always `"2.0"`.
    pub swagger: String,

    /// Title, version and description.
    pub info: Info,

    /// Host (and optional port) serving the API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Base path prepended to every path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Transfer schemes (`http`, `https`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,

    /// Path template → operations by verb.
    pub paths: IndexMap<String, PathItem>,

    /// Named schemas referenced from operations.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, Schema>,
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "OData API".to_string(),
            version: "v1".to_string(),
            description: None,
        }
    }
}

/// Operations sharing one path template, at most one per verb.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    patch: Option<Operation>,
}

impl PathItem {
    fn slot(&self, verb: HttpVerb) -> &Option<Operation> {
        match verb {
            HttpVerb::Get => &self.get,
            HttpVerb::Put => &self.put,
            HttpVerb::Post => &self.post,
            HttpVerb::Delete => &self.delete,
            HttpVerb::Patch => &self.patch,
        }
    }

    fn slot_mut(&mut self, verb: HttpVerb) -> &mut Option<Operation> {
        match verb {
            HttpVerb::Get => &mut self.get,
            HttpVerb::Put => &mut self.put,
            HttpVerb::Post => &mut self.post,
            HttpVerb::Delete => &mut self.delete,
            HttpVerb::Patch => &mut self.patch,
        }
    }

    /// The operation for `verb`.
    #[must_use]
    pub fn operation(&self, verb: HttpVerb) -> Option<&Operation> {
        self.slot(verb).as_ref()
    }

    /// Mutable access to the operation for `verb`.
    pub fn operation_mut(&mut self, verb: HttpVerb) -> Option<&mut Operation> {
        self.slot_mut(verb).as_mut()
    }

    /// Store `operation` under `verb`, returning the one it replaced.
    pub fn insert(&mut self, verb: HttpVerb, operation: Operation) -> Option<Operation> {
        self.slot_mut(verb).replace(operation)
    }

    /// Remove the operation for `verb`.
    pub fn remove(&mut self, verb: HttpVerb) -> Option<Operation> {
        self.slot_mut(verb).take()
    }

    /// Present operations in output verb order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpVerb, &Operation)> {
        HttpVerb::ALL
            .into_iter()
            .filter_map(|verb| self.operation(verb).map(|op| (verb, op)))
    }

    /// Whether no verb has an operation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        HttpVerb::ALL.into_iter().all(|verb| self.slot(verb).is_none())
    }
}

/// One verb on one path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Grouping tags (the owning container).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// One-line summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Document-wide unique identifier.
    pub operation_id: String,

    /// Request media types.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,

    /// Response media types.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,

    /// Parameters; path parameters first, then query, then the body.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    /// Status code → response.
    pub responses: IndexMap<String, Response>,

    /// Marked obsolete.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

impl Operation {
    /// Look up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The body parameter, if any.
    #[must_use]
    pub fn body_parameter(&self) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.location == ParameterLocation::Body)
    }
}

/// A response entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Human-readable description (required by Swagger 2.0).
    pub description: String,

    /// Response body schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Substituted into a path placeholder.
    Path,
    /// Query string.
    Query,
    /// Request body.
    Body,
}

impl ParameterLocation {
    /// Swagger `in` value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation parameter with its resolved location and schema.
///
/// Body parameters serialize their schema under `schema`; the others
/// inline `type`, `format`, `items` and `enum` as Swagger 2.0 requires.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where the value travels.
    pub location: ParameterLocation,
    /// Human-readable description.
    pub description: Option<String>,
    /// Whether the caller must supply it; always true for path parameters.
    pub required: bool,
    /// Value schema.
    pub schema: Schema,
}

impl Serialize for Parameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("in", self.location.as_str())?;
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        map.serialize_entry("required", &self.required)?;

        if self.location == ParameterLocation::Body {
            map.serialize_entry("schema", &self.schema)?;
            return map.end();
        }

        // Non-body parameters cannot carry a `$ref` or an object; describe
        // them as strings.
        let simple = self.schema.reference.is_none()
            && self.schema.schema_type.as_deref() != Some("object");
        if !simple {
            map.serialize_entry("type", "string")?;
            return map.end();
        }
        if let Some(schema_type) = &self.schema.schema_type {
            map.serialize_entry("type", schema_type)?;
        }
        if let Some(format) = &self.schema.format {
            map.serialize_entry("format", format)?;
        }
        if let Some(items) = &self.schema.items {
            map.serialize_entry("items", items)?;
        }
        if !self.schema.enum_values.is_empty() {
            map.serialize_entry("enum", &self.schema.enum_values)?;
        }
        map.end()
    }
}

impl Document {
    /// Empty document with the given metadata.
    #[must_use]
    pub fn new(info: Info) -> Self {
        Self {
            swagger: SWAGGER_VERSION.to_string(),
            info,
            host: None,
            base_path: None,
            schemes: Vec::new(),
            paths: IndexMap::new(),
            definitions: IndexMap::new(),
        }
    }

    /// The operation at `path` for `verb`.
    #[must_use]
    pub fn operation(&self, path: &str, verb: HttpVerb) -> Option<&Operation> {
        self.paths.get(path).and_then(|item| item.operation(verb))
    }

    /// Every operation as `(path, verb, operation)`, in output order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, HttpVerb, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations()
                .map(move |(verb, op)| (path.as_str(), verb, op))
        })
    }

    /// Definition names referenced from operations or definitions but
    /// missing from the definitions table. Empty for a consistent document.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<String> {
        let mut referenced: Vec<&str> = Vec::new();
        let mut collect = |name| {
            if !referenced.contains(&name) {
                referenced.push(name);
            }
        };
        for (_, _, op) in self.operations() {
            for param in &op.parameters {
                param.schema.visit_references(&mut collect);
            }
            for response in op.responses.values() {
                if let Some(schema) = &response.schema {
                    schema.visit_references(&mut collect);
                }
            }
        }
        for schema in self.definitions.values() {
            schema.visit_references(&mut collect);
        }
        referenced
            .into_iter()
            .filter(|name| !self.definitions.contains_key(*name))
            .map(ToString::to_string)
            .collect()
    }

    /// Serialize as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
