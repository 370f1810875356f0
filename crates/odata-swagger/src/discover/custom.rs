//! Caller-registered routes that neither the model nor attributes describe.

use crate::descriptor::TypeDescriptor;
use crate::discover::{
    path_placeholders, route_path, CandidateOperation, CandidateParameter, DiscoverySource,
    DiscoveryStrategy,
};
use crate::model::ODataRoute;
use crate::HttpVerb;

/// A route declared by hand and emitted under an existing route's prefix.
///
/// # Example
///
/// ```ignore
/// let template = "Customers({Id})/Promote";
/// let route = CustomRoute::new("ODataRoute", HttpVerb::Post, template, "Customers", "Promote")
///     .parameter("Id", TypeDescriptor::int32(), true)
///     .parameter("level", TypeDescriptor::string(), false);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRoute {
    route_name: String,
    verb: HttpVerb,
    template: String,
    controller: String,
    action: String,
    parameters: Vec<CandidateParameter>,
    return_type: Option<TypeDescriptor>,
}

impl CustomRoute {
    /// `verb template` under the route named `route_name`, implemented by
    /// `controller`'s `action`.
    #[must_use]
    pub fn new(
        route_name: &str,
        verb: HttpVerb,
        template: &str,
        controller: &str,
        action: &str,
    ) -> Self {
        Self {
            route_name: route_name.to_string(),
            verb,
            template: template.to_string(),
            controller: controller.to_string(),
            action: action.to_string(),
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Append a parameter. Names matching a template placeholder become
    /// path parameters.
    #[must_use]
    pub fn parameter(mut self, name: &str, ty: TypeDescriptor, required: bool) -> Self {
        let param = if path_placeholders(&self.template).contains(&name) {
            CandidateParameter::route(name, ty)
        } else {
            CandidateParameter::operation(name, ty, required)
        };
        self.parameters.push(param);
        self
    }

    /// Declared response type, used when the runtime action declares none.
    #[must_use]
    pub fn returns(mut self, ty: TypeDescriptor) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Name of the route the template is mounted under.
    #[must_use]
    pub fn route_name(&self) -> &str {
        &self.route_name
    }
}

/// Emits the registered [`CustomRoute`]s belonging to each route.
#[derive(Debug, Clone, Default)]
pub struct CustomStrategy {
    routes: Vec<CustomRoute>,
}

impl CustomStrategy {
    /// Strategy over `routes`.
    #[must_use]
    pub fn new(routes: Vec<CustomRoute>) -> Self {
        Self { routes }
    }
}

impl DiscoveryStrategy for CustomStrategy {
    fn name(&self) -> &str {
        "custom"
    }

    fn discover(&self, route: &ODataRoute) -> Vec<CandidateOperation> {
        self.routes
            .iter()
            .filter(|custom| custom.route_name == route.name)
            .map(|custom| {
                let mut candidate = CandidateOperation::new(
                    DiscoverySource::Custom,
                    &route.name,
                    custom.verb,
                    route_path(&route.prefix, &custom.template),
                    &custom.controller,
                    &custom.action,
                );
                candidate.parameters.clone_from(&custom.parameters);
                candidate.return_type.clone_from(&custom.return_type);
                let action = route
                    .controller(&custom.controller)
                    .and_then(|c| c.find_action(std::slice::from_ref(&custom.action)));
                if action.is_none() {
                    tracing::debug!(
                        controller = %custom.controller,
                        action = %custom.action,
                        "custom route has no runtime action"
                    );
                }
                candidate.attach_action(action);
                candidate
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::discover::Provenance;
    use crate::model::{ActionDescriptor, ControllerDescriptor, EdmModel};

    #[test]
    fn emits_only_under_its_route() {
        let custom = CustomRoute::new(
            "V1",
            HttpVerb::Post,
            "Customers({Id})/Promote",
            "Customers",
            "Promote",
        )
        .parameter("Id", TypeDescriptor::int32(), true)
        .parameter("level", TypeDescriptor::string(), false);
        let strategy = CustomStrategy::new(vec![custom]);

        let v1 = ODataRoute {
            name: "V1".to_string(),
            prefix: "odata/v1".to_string(),
            model: EdmModel::default(),
            controllers: vec![ControllerDescriptor::new("Customers")
                .action(ActionDescriptor::new("Promote"))],
        };
        let v2 = ODataRoute {
            name: "V2".to_string(),
            ..v1.clone()
        };

        assert!(strategy.discover(&v2).is_empty());
        let candidates = strategy.discover(&v1);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.path, "/odata/v1/Customers({Id})/Promote");
        assert_eq!(c.source, DiscoverySource::Custom);
        assert_eq!(c.parameters[0].provenance, Provenance::Route);
        assert_eq!(c.parameters[1].provenance, Provenance::Operation);
        assert!(c.action.is_some());
    }
}
