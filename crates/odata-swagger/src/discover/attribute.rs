//! Attribute strategy: controller actions that declare their own route.

use crate::descriptor::{MemberDescriptor, TypeDescriptor};
use crate::discover::{
    path_placeholders, route_path, CandidateOperation, CandidateParameter, DiscoverySource,
    DiscoveryStrategy, Provenance,
};
use crate::model::{FormalParameter, ODataRoute, ParameterSource};

/// Emits one candidate per attribute-routed action, using its declared
/// verb and formal parameters as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeStrategy;

impl DiscoveryStrategy for AttributeStrategy {
    fn name(&self) -> &str {
        "attribute"
    }

    fn discover(&self, route: &ODataRoute) -> Vec<CandidateOperation> {
        let mut candidates = Vec::new();
        for controller in &route.controllers {
            for action in &controller.actions {
                let Some(template) = &action.route_template else {
                    continue;
                };
                let path = route_path(&route.prefix, template);
                let placeholders: Vec<String> =
                    path_placeholders(&path).into_iter().map(String::from).collect();

                let mut candidate = CandidateOperation::new(
                    DiscoverySource::Attribute,
                    &route.name,
                    action.effective_verb(),
                    path,
                    &controller.name,
                    &action.name,
                );
                candidate.parameters = action
                    .parameters
                    .iter()
                    .map(|formal| candidate_parameter(route, &action.name, formal, &placeholders))
                    .collect();
                candidate.attach_action(Some(action));
                candidates.push(candidate);
            }
        }
        candidates
    }
}

fn candidate_parameter(
    route: &ODataRoute,
    action_name: &str,
    formal: &FormalParameter,
    placeholders: &[String],
) -> CandidateParameter {
    if placeholders.iter().any(|p| p == &formal.name) {
        return CandidateParameter::route(&formal.name, formal.ty.clone());
    }

    let ty = if formal.source == ParameterSource::ActionParameters {
        structured_parameters_type(route, action_name).unwrap_or_else(|| formal.ty.clone())
    } else {
        formal.ty.clone()
    };
    CandidateParameter {
        name: formal.name.clone(),
        ty,
        required: !formal.optional,
        provenance: Provenance::Operation,
    }
}

/// Inline record of the parameters the model declares for the action of
/// the same name.
fn structured_parameters_type(route: &ODataRoute, action_name: &str) -> Option<TypeDescriptor> {
    let op = route
        .model
        .operations
        .iter()
        .find(|op| op.name == action_name)?;
    let members = op
        .parameters
        .iter()
        .map(|p| {
            let member = MemberDescriptor::new(&p.name, p.ty.clone());
            if p.optional {
                member.optional()
            } else {
                member
            }
        })
        .collect();
    Some(TypeDescriptor::inline(members))
}
