//! Route discovery: producers of candidate operations.
//!
//! Three independent strategies walk one [`ODataRoute`] each and emit the
//! same intermediate [`CandidateOperation`] shape:
//! - **Model** ([`ModelStrategy`]): entity-set CRUD, bound and unbound
//!   actions and functions declared by the route's metadata model
//! - **Custom** ([`CustomStrategy`]): routes registered by the caller
//! - **Attribute** ([`AttributeStrategy`]): attribute-routed controller actions
//!
//! Strategies depend only on the route table, never on generated output, so
//! new producers can be added by implementing [`DiscoveryStrategy`].

mod attribute;
mod custom;
mod model;

use std::fmt;
use std::sync::Arc;

use crate::descriptor::TypeDescriptor;
use crate::model::{ActionDescriptor, ODataRoute, RouteTable};
use crate::{reflect, HttpVerb};

pub use attribute::AttributeStrategy;
pub use custom::{CustomRoute, CustomStrategy};
pub use model::ModelStrategy;

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    /// Metadata-model strategy.
    Model,
    /// Caller-registered custom route.
    Custom,
    /// Attribute-routed controller action.
    Attribute,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Model => "model",
            Self::Custom => "custom",
            Self::Attribute => "attribute",
        })
    }
}

/// Whether a candidate parameter is embedded in the path template or is an
/// operation-level parameter the binder must place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Appears as a `{name}` placeholder in the path template.
    Route,
    /// Declared by the operation; location decided at binding time.
    Operation,
}

/// Which OData system query options an operation accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Queryable {
    /// None.
    #[default]
    None,
    /// Collection options (`$filter`, `$orderby`, paging, projection).
    Collection,
    /// Single-entity options (`$select`, `$expand`).
    Single,
}

/// A discovered parameter before binding.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateParameter {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: TypeDescriptor,
    /// Declared required.
    pub required: bool,
    /// Path placeholder or operation parameter.
    pub provenance: Provenance,
}

impl CandidateParameter {
    /// Required parameter embedded in the path template.
    #[must_use]
    pub fn route(name: &str, ty: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
            provenance: Provenance::Route,
        }
    }

    /// Operation-level parameter.
    #[must_use]
    pub fn operation(name: &str, ty: TypeDescriptor, required: bool) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required,
            provenance: Provenance::Operation,
        }
    }
}

/// An undetermined route entry produced by exactly one strategy.
///
/// Never mutated after discovery; binding produces a new structure.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOperation {
    /// Producing strategy.
    pub source: DiscoverySource,
    /// Name of the route the candidate belongs to.
    pub route_name: String,
    /// Absolute path template with `{name}` placeholders.
    pub path: String,
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Owning container (entity set or controller name).
    pub container: String,
    /// Action name used for the operation id; the runtime action's name
    /// once one is attached.
    pub action_name: String,
    /// Parameters in declaration order.
    pub parameters: Vec<CandidateParameter>,
    /// Declared return type from the model.
    pub return_type: Option<TypeDescriptor>,
    /// The runtime action implementing the candidate, when one was found.
    pub action: Option<ActionDescriptor>,
    /// Success status code when a response body is present.
    pub success_status: u16,
    /// Accepted system query options.
    pub queryable: Queryable,
}

impl CandidateOperation {
    /// Candidate with no parameters, return type, or runtime action.
    #[must_use]
    pub fn new(
        source: DiscoverySource,
        route_name: &str,
        verb: HttpVerb,
        path: String,
        container: &str,
        action_name: &str,
    ) -> Self {
        Self {
            source,
            route_name: route_name.to_string(),
            path,
            verb,
            container: container.to_string(),
            action_name: action_name.to_string(),
            parameters: Vec::new(),
            return_type: None,
            action: None,
            success_status: 200,
            queryable: Queryable::None,
        }
    }

    /// Base operation id: `{container}_{action}`.
    #[must_use]
    pub fn operation_id(&self) -> String {
        format!("{}_{}", self.container, self.action_name)
    }

    /// Placeholder names in the path template, in order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        path_placeholders(&self.path)
    }

    /// Response type: the runtime action's declared type wins over the
    /// model's, with async and single-result wrappers removed.
    #[must_use]
    pub fn response_type(&self) -> Option<&TypeDescriptor> {
        self.action
            .as_ref()
            .and_then(|a| a.return_type.as_ref())
            .or(self.return_type.as_ref())
            .map(reflect::unwrap_transparent)
    }

    /// Attach the runtime action, taking its name for the operation id and
    /// deriving query support from it.
    pub(crate) fn attach_action(&mut self, action: Option<&ActionDescriptor>) {
        if let Some(action) = action {
            self.action_name.clone_from(&action.name);
        }
        self.action = action.cloned();
        self.queryable = match (&self.action, self.verb) {
            (Some(action), HttpVerb::Get) if action.enable_query => {
                if self.response_type().is_some_and(reflect::is_collection) {
                    Queryable::Collection
                } else {
                    Queryable::Single
                }
            }
            _ => Queryable::None,
        };
    }
}

/// A producer of candidate operations for one route.
pub trait DiscoveryStrategy: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Candidates for `route`, in a stable order.
    fn discover(&self, route: &ODataRoute) -> Vec<CandidateOperation>;
}

/// Run every strategy over every route, strategies outermost.
///
/// Routes are discovered independently; their prefixes keep identical
/// operation shapes in different versions apart.
#[must_use]
pub fn discover_all(
    strategies: &[Arc<dyn DiscoveryStrategy>],
    routes: &RouteTable,
) -> Vec<CandidateOperation> {
    let mut candidates = Vec::new();
    for strategy in strategies {
        for route in &routes.routes {
            let found = strategy.discover(route);
            tracing::debug!(
                strategy = strategy.name(),
                route = %route.name,
                count = found.len(),
                "discovered candidates"
            );
            candidates.extend(found);
        }
    }
    candidates
}

/// Placeholder names in a path template (`/a({Id})/b` → `["Id"]`).
#[must_use]
pub fn path_placeholders(path: &str) -> Vec<&str> {
    path.split('{')
        .skip(1)
        .filter_map(|s| s.split('}').next())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Absolute path for `relative` under a route `prefix`.
pub(crate) fn route_path(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let relative = relative.trim_start_matches('/');
    if prefix.is_empty() {
        format!("/{relative}")
    } else {
        format!("/{prefix}/{relative}")
    }
}
