//! Metadata-model and routing input types.
//!
//! A [`RouteTable`] holds one [`ODataRoute`] per mapped service route. Each
//! route binds a path prefix to its own [`EdmModel`] (so versioned routes can
//! expose different models) and lists the controllers whose actions
//! implement it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::TypeDescriptor;

/// All mapped service routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    /// Routes in registration order.
    #[serde(default)]
    pub routes: Vec<ODataRoute>,
}

impl RouteTable {
    /// Look up a route by name.
    #[must_use]
    pub fn route(&self, name: &str) -> Option<&ODataRoute> {
        self.routes.iter().find(|r| r.name == name)
    }
}

/// A named route mapped to a path prefix and a metadata model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ODataRoute {
    /// Route name (e.g., `V1RouteVersioning`).
    pub name: String,

    /// Path prefix without leading or trailing slash (e.g., `odata/v1`).
    #[serde(default)]
    pub prefix: String,

    /// Metadata model served under this prefix.
    #[serde(default)]
    pub model: EdmModel,

    /// Controllers implementing the route.
    #[serde(default)]
    pub controllers: Vec<ControllerDescriptor>,
}

impl ODataRoute {
    /// Look up a controller by name.
    #[must_use]
    pub fn controller(&self, name: &str) -> Option<&ControllerDescriptor> {
        self.controllers.iter().find(|c| c.name == name)
    }
}

/// Declarative description of entities and their operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdmModel {
    /// Namespace qualifying bound operation names (e.g., `Default`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Entity sets in declaration order.
    #[serde(default)]
    pub entity_sets: Vec<EntitySet>,

    /// Bound and unbound operations in declaration order.
    #[serde(default)]
    pub operations: Vec<EdmOperation>,
}

impl EdmModel {
    /// Look up an entity set by name.
    #[must_use]
    pub fn entity_set(&self, name: &str) -> Option<&EntitySet> {
        self.entity_sets.iter().find(|s| s.name == name)
    }
}

/// An addressable collection of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    /// Set name, used as the path segment (e.g., `Suppliers`).
    pub name: String,

    /// Entity type; a composite descriptor.
    pub entity_type: TypeDescriptor,

    /// Key member names, in key order.
    pub keys: Vec<String>,

    /// Which CRUD routes the set supports.
    #[serde(default)]
    pub capabilities: Capabilities,
}

/// CRUD capabilities of an entity set (all enabled by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// `GET /Set`.
    pub read: bool,
    /// `GET /Set({key})`.
    pub read_by_key: bool,
    /// `POST /Set`.
    pub insert: bool,
    /// `PUT /Set({key})`.
    pub update: bool,
    /// `PATCH /Set({key})`.
    pub patch: bool,
    /// `DELETE /Set({key})`.
    pub delete: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            read: true,
            read_by_key: true,
            insert: true,
            update: true,
            patch: true,
            delete: true,
        }
    }
}

impl Capabilities {
    /// Read-only set: collection and by-key reads.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read: true,
            read_by_key: true,
            insert: false,
            update: false,
            patch: false,
            delete: false,
        }
    }
}

/// Action (side effects, POST) or function (side-effect free, GET).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Invoked with POST; parameters travel in the body.
    Action,
    /// Invoked with GET; parameters travel in the path.
    Function,
}

/// Binding target of a bound operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundTo {
    /// Entity set whose path the operation extends.
    pub entity_set: String,

    /// Bound to the whole collection rather than a single entity.
    #[serde(default)]
    pub collection: bool,
}

/// A declared action or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdmOperation {
    /// Operation name (e.g., `Rate`).
    pub name: String,

    /// Action or function.
    pub kind: OperationKind,

    /// Binding target; `None` for unbound (top-level) operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_to: Option<BoundTo>,

    /// Declared parameters, excluding the binding parameter.
    #[serde(default)]
    pub parameters: Vec<OperationParameter>,

    /// Declared return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeDescriptor>,
}

impl EdmOperation {
    /// Unbound action with no parameters.
    #[must_use]
    pub fn action(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: OperationKind::Action,
            bound_to: None,
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Unbound function with no parameters.
    #[must_use]
    pub fn function(name: &str) -> Self {
        Self {
            kind: OperationKind::Function,
            ..Self::action(name)
        }
    }

    /// Bind to a single entity of `entity_set`.
    #[must_use]
    pub fn bound_to_entity(mut self, entity_set: &str) -> Self {
        self.bound_to = Some(BoundTo {
            entity_set: entity_set.to_string(),
            collection: false,
        });
        self
    }

    /// Bind to the whole `entity_set` collection.
    #[must_use]
    pub fn bound_to_collection(mut self, entity_set: &str) -> Self {
        self.bound_to = Some(BoundTo {
            entity_set: entity_set.to_string(),
            collection: true,
        });
        self
    }

    /// Append a required parameter.
    #[must_use]
    pub fn parameter(mut self, name: &str, ty: TypeDescriptor) -> Self {
        self.parameters.push(OperationParameter {
            name: name.to_string(),
            ty,
            optional: false,
        });
        self
    }

    /// Append an optional parameter.
    #[must_use]
    pub fn optional_parameter(mut self, name: &str, ty: TypeDescriptor) -> Self {
        self.parameters.push(OperationParameter {
            name: name.to_string(),
            ty,
            optional: true,
        });
        self
    }

    /// Set the return type.
    #[must_use]
    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.return_type = Some(ty);
        self
    }
}

/// A declared operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationParameter {
    /// Parameter name.
    pub name: String,

    /// Parameter type.
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,

    /// Declared optional.
    #[serde(default)]
    pub optional: bool,
}

/// A controller exposing runtime actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerDescriptor {
    /// Controller name without the `Controller` suffix (e.g., `Suppliers`).
    pub name: String,

    /// Actions in declaration order.
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
}

impl ControllerDescriptor {
    /// Controller with no actions.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            actions: Vec::new(),
        }
    }

    /// Append an action.
    #[must_use]
    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.actions.push(action);
        self
    }

    /// First action whose name matches any of `names`.
    #[must_use]
    pub fn find_action(&self, names: &[String]) -> Option<&ActionDescriptor> {
        names
            .iter()
            .find_map(|name| self.actions.iter().find(|a| &a.name == name))
    }
}

/// The real formal signature of a runtime action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ActionDescriptor {
    /// Action (method) name.
    pub name: String,

    /// Declared HTTP verb; inferred from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<HttpVerb>,

    /// Attribute route template relative to the route prefix, if attribute-routed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_template: Option<String>,

    /// Formal parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<FormalParameter>,

    /// Declared response type; wins over the model's return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeDescriptor>,

    /// One-line summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Supports OData system query options.
    #[serde(default)]
    pub enable_query: bool,

    /// Marked obsolete.
    #[serde(default)]
    pub deprecated: bool,
}

impl ActionDescriptor {
    /// Action with no parameters, verb, or route template.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            verb: None,
            route_template: None,
            parameters: Vec::new(),
            return_type: None,
            summary: None,
            description: None,
            enable_query: false,
            deprecated: false,
        }
    }

    /// Set the HTTP verb.
    #[must_use]
    pub fn verb(mut self, verb: HttpVerb) -> Self {
        self.verb = Some(verb);
        self
    }

    /// Attribute-route the action.
    #[must_use]
    pub fn route(mut self, template: &str) -> Self {
        self.route_template = Some(template.to_string());
        self
    }

    /// Append a formal parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: FormalParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Set the declared response type.
    #[must_use]
    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Enable OData system query options.
    #[must_use]
    pub fn queryable(mut self) -> Self {
        self.enable_query = true;
        self
    }

    /// The declared verb, or the one implied by the action name.
    #[must_use]
    pub fn effective_verb(&self) -> HttpVerb {
        self.verb
            .unwrap_or_else(|| HttpVerb::infer_from_action_name(&self.name))
    }
}

/// Where a formal parameter reads its value from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    /// No explicit source; decided by type.
    #[default]
    Auto,
    /// Read from the URI (path or query).
    Uri,
    /// Read from the request body.
    Body,
    /// Structured action parameters: every operation parameter in one body object.
    ActionParameters,
}

/// A formal parameter of a runtime action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormalParameter {
    /// Parameter name.
    pub name: String,

    /// Parameter type.
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,

    /// Documented description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Value source.
    #[serde(default)]
    pub source: ParameterSource,

    /// Has a default value.
    #[serde(default)]
    pub optional: bool,
}

impl FormalParameter {
    /// Parameter with automatic source.
    #[must_use]
    pub fn new(name: &str, ty: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            ty,
            description: None,
            source: ParameterSource::Auto,
            optional: false,
        }
    }

    /// Structured action-parameters object named `name`.
    #[must_use]
    pub fn action_parameters(name: &str) -> Self {
        Self {
            source: ParameterSource::ActionParameters,
            ..Self::new(
                name,
                TypeDescriptor::composite("System.Web.OData.ODataActionParameters", Vec::new()),
            )
        }
    }

    /// Set the value source.
    #[must_use]
    pub fn source(mut self, source: ParameterSource) -> Self {
        self.source = source;
        self
    }

    /// Set the documented description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Mark as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// HTTP verbs that operations can be exposed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
    Patch,
}

impl HttpVerb {
    /// All verbs in document output order.
    pub const ALL: [Self; 5] = [Self::Get, Self::Put, Self::Post, Self::Delete, Self::Patch];

    /// Lowercase verb name as used in API description documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Patch => "patch",
        }
    }

    /// Verb implied by an action-name prefix (`GetX` → GET); POST otherwise.
    #[must_use]
    pub fn infer_from_action_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|verb| lower.starts_with(verb.as_str()))
            .unwrap_or(Self::Post)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn verb_inferred_from_action_prefix() {
        assert_eq!(HttpVerb::infer_from_action_name("GetSuppliers"), HttpVerb::Get);
        assert_eq!(HttpVerb::infer_from_action_name("Delete"), HttpVerb::Delete);
        assert_eq!(HttpVerb::infer_from_action_name("PatchOrder"), HttpVerb::Patch);
        assert_eq!(HttpVerb::infer_from_action_name("Calculate"), HttpVerb::Post);
    }

    #[test]
    fn declared_verb_wins() {
        let action = ActionDescriptor::new("GetThing").verb(HttpVerb::Post);
        assert_eq!(action.effective_verb(), HttpVerb::Post);
    }

    #[test]
    fn capabilities_default_all_enabled() {
        let caps: Capabilities = serde_yaml_ng::from_str("delete: false").unwrap();
        assert!(caps.read && caps.read_by_key && caps.insert && caps.update && caps.patch);
        assert!(!caps.delete);
    }

    #[test]
    fn find_action_respects_name_priority() {
        let controller = ControllerDescriptor::new("Suppliers")
            .action(ActionDescriptor::new("Get"))
            .action(ActionDescriptor::new("GetSuppliers"));
        let names = vec!["GetSuppliers".to_string(), "Get".to_string()];
        assert_eq!(controller.find_action(&names).unwrap().name, "GetSuppliers");
    }

    #[test]
    fn deserialize_route_table() {
        let yaml = r"
routes:
  - name: ODataRoute
    prefix: odata
    model:
      namespace: Default
      entity_sets:
        - name: Suppliers
          keys: [Id]
          entity_type:
            name: Supplier
            kind: composite
            members:
              - name: Id
                type: { name: Int64, kind: primitive, primitive: int64 }
      operations:
        - name: Rate
          kind: action
          bound_to: { entity_set: Suppliers }
          parameters:
            - name: Rating
              type: { name: Int32, kind: primitive, primitive: int32 }
    controllers:
      - name: Suppliers
        actions:
          - name: Rate
            verb: post
            parameters:
              - name: parameters
                source: action_parameters
                type: { name: ODataActionParameters, kind: composite, members: [] }
";
        let table: RouteTable = serde_yaml_ng::from_str(yaml).unwrap();
        let route = table.route("ODataRoute").unwrap();
        assert_eq!(route.prefix, "odata");
        assert_eq!(route.model.namespace.as_deref(), Some("Default"));
        assert_eq!(route.model.entity_sets[0].keys, vec!["Id"]);
        assert!(route.model.entity_sets[0].capabilities.delete);
        let op = &route.model.operations[0];
        assert_eq!(op.kind, OperationKind::Action);
        assert!(!op.bound_to.as_ref().unwrap().collection);
        let action = &route.controller("Suppliers").unwrap().actions[0];
        assert_eq!(action.parameters[0].source, ParameterSource::ActionParameters);
    }
}
