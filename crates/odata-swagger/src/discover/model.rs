//! Metadata-model strategy: entity-set CRUD plus declared operations.

use crate::descriptor::{MemberDescriptor, Primitive, TypeDescriptor};
use crate::discover::{
    route_path, CandidateOperation, CandidateParameter, DiscoverySource, DiscoveryStrategy,
};
use crate::model::{
    ActionDescriptor, ControllerDescriptor, EdmOperation, EntitySet, ODataRoute, OperationKind,
};
use crate::{reflect, HttpVerb};

/// Walks each route's metadata model.
///
/// For every entity set: collection GET, POST, and by-key GET, PUT, PATCH
/// and DELETE, each only when the set's capabilities allow it. For every
/// declared operation: one candidate under the bound entity (or collection)
/// path, or at the route root when unbound. Actions are POSTed with their
/// parameters collapsed into one `parameters` body object; functions are
/// GET with every parameter embedded in the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelStrategy;

impl DiscoveryStrategy for ModelStrategy {
    fn name(&self) -> &str {
        "model"
    }

    fn discover(&self, route: &ODataRoute) -> Vec<CandidateOperation> {
        let mut candidates = Vec::new();
        for set in &route.model.entity_sets {
            entity_set_candidates(route, set, &mut candidates);
        }
        for op in &route.model.operations {
            if let Some(candidate) = operation_candidate(route, op) {
                candidates.push(candidate);
            }
        }
        candidates
    }
}

fn entity_set_candidates(route: &ODataRoute, set: &EntitySet, out: &mut Vec<CandidateOperation>) {
    let caps = set.capabilities;
    let set_path = route_path(&route.prefix, &set.name);
    let (key_segment, key_params) = key_segment(set);
    let keyed_path = format!("{set_path}{key_segment}");
    let controller = route.controller(&set.name);
    let type_name = set.entity_type.name.as_str();
    let entity = set.entity_type.clone();
    let body_name = lower_first(type_name);
    let keyless = set.keys.is_empty();
    if keyless && (caps.read_by_key || caps.update || caps.patch || caps.delete) {
        tracing::warn!(
            entity_set = %set.name,
            "entity set declares no keys, skipping by-key operations"
        );
    }

    let candidate = |verb, path: &str, action_name: &str| {
        CandidateOperation::new(
            DiscoverySource::Model,
            &route.name,
            verb,
            path.to_string(),
            &set.name,
            action_name,
        )
    };

    if caps.read {
        let mut c = candidate(HttpVerb::Get, &set_path, "Get");
        c.return_type = Some(TypeDescriptor::array(entity.clone()));
        let names = [format!("Get{}", set.name), "Get".to_string()];
        c.attach_action(find_action(controller, &names, Some(false), &set.keys));
        out.push(c);
    }
    if caps.read_by_key && !keyless {
        let mut c = candidate(HttpVerb::Get, &keyed_path, "GetById");
        c.parameters.clone_from(&key_params);
        c.return_type = Some(entity.clone());
        let names = [format!("Get{type_name}"), "Get".to_string()];
        c.attach_action(find_action(controller, &names, Some(true), &set.keys));
        out.push(c);
    }
    if caps.insert {
        let mut c = candidate(HttpVerb::Post, &set_path, "Post");
        c.parameters
            .push(CandidateParameter::operation(&body_name, entity.clone(), true));
        c.return_type = Some(entity.clone());
        c.success_status = 201;
        let names = [format!("Post{type_name}"), "Post".to_string()];
        c.attach_action(find_action(controller, &names, None, &set.keys));
        out.push(c);
    }

    let writes = [
        (caps.update, HttpVerb::Put, "Put", true),
        (caps.patch, HttpVerb::Patch, "Patch", true),
        (caps.delete, HttpVerb::Delete, "Delete", false),
    ];
    for (enabled, verb, action_name, has_body) in writes {
        if !enabled || keyless {
            continue;
        }
        let mut c = candidate(verb, &keyed_path, action_name);
        c.parameters.clone_from(&key_params);
        if has_body {
            c.parameters
                .push(CandidateParameter::operation(&body_name, entity.clone(), true));
        }
        let names = [format!("{action_name}{type_name}"), action_name.to_string()];
        c.attach_action(find_action(controller, &names, None, &set.keys));
        out.push(c);
    }
}

fn operation_candidate(route: &ODataRoute, op: &EdmOperation) -> Option<CandidateOperation> {
    let (base_path, container, mut parameters, controller, type_name) = match &op.bound_to {
        Some(bound) => {
            let Some(set) = route.model.entity_set(&bound.entity_set) else {
                tracing::warn!(
                    operation = %op.name,
                    entity_set = %bound.entity_set,
                    "bound operation targets an unknown entity set, skipping"
                );
                return None;
            };
            let set_path = route_path(&route.prefix, &set.name);
            let qualified = match route.model.namespace.as_deref() {
                Some(ns) if !ns.is_empty() => format!("{ns}.{}", op.name),
                _ => op.name.clone(),
            };
            let (path, params) = if bound.collection {
                (format!("{set_path}/{qualified}"), Vec::new())
            } else {
                let (segment, params) = key_segment(set);
                (format!("{set_path}{segment}/{qualified}"), params)
            };
            (
                path,
                set.name.clone(),
                params,
                route.controller(&set.name),
                Some(set.entity_type.name.as_str()),
            )
        }
        None => {
            let controller = route
                .controllers
                .iter()
                .find(|c| c.actions.iter().any(|a| a.name == op.name));
            let container = controller.map_or_else(|| route.name.clone(), |c| c.name.clone());
            (
                route_path(&route.prefix, &op.name),
                container,
                Vec::new(),
                controller,
                None,
            )
        }
    };

    let (verb, path) = match op.kind {
        OperationKind::Action => {
            if !op.parameters.is_empty() {
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
                let required = op.parameters.iter().any(|p| !p.optional);
                parameters.push(CandidateParameter::operation(
                    "parameters",
                    TypeDescriptor::inline(members),
                    required,
                ));
            }
            (HttpVerb::Post, base_path)
        }
        OperationKind::Function => {
            let segment = op
                .parameters
                .iter()
                .map(|p| format!("{}={}", p.name, placeholder(&p.name, &p.ty)))
                .collect::<Vec<_>>()
                .join(",");
            parameters.extend(
                op.parameters
                    .iter()
                    .map(|p| CandidateParameter::route(&p.name, p.ty.clone())),
            );
            (HttpVerb::Get, format!("{base_path}({segment})"))
        }
    };

    let mut candidate = CandidateOperation::new(
        DiscoverySource::Model,
        &route.name,
        verb,
        path,
        &container,
        &op.name,
    );
    candidate.parameters = parameters;
    candidate.return_type.clone_from(&op.return_type);

    let mut names = vec![op.name.clone()];
    if let Some(type_name) = type_name {
        names.push(format!("{}On{type_name}", op.name));
    }
    candidate.attach_action(find_action(controller, &names, None, &[]));
    Some(candidate)
}

/// Key segment of a by-key path and its parameters.
///
/// One key yields `({Id})`; several yield `(A={A},B='{B}')`. String keys
/// are quoted.
fn key_segment(set: &EntitySet) -> (String, Vec<CandidateParameter>) {
    let params: Vec<CandidateParameter> = set
        .keys
        .iter()
        .map(|key| {
            let ty = match set.entity_type.member(key) {
                Some(member) => member.ty.clone(),
                None => {
                    tracing::debug!(
                        entity_set = %set.name,
                        key = %key,
                        "key is not a member of the entity type, describing as string"
                    );
                    TypeDescriptor::string()
                }
            };
            CandidateParameter::route(key, ty)
        })
        .collect();

    let segment = match params.as_slice() {
        [] => String::new(),
        [single] => format!("({})", placeholder(&single.name, &single.ty)),
        many => {
            let parts: Vec<String> = many
                .iter()
                .map(|p| format!("{}={}", p.name, placeholder(&p.name, &p.ty)))
                .collect();
            format!("({})", parts.join(","))
        }
    };
    (segment, params)
}

/// `{name}`, quoted when the value is a string literal.
fn placeholder(name: &str, ty: &TypeDescriptor) -> String {
    if reflect::underlying_type_or_self(ty).as_primitive() == Some(Primitive::String) {
        format!("'{{{name}}}'")
    } else {
        format!("{{{name}}}")
    }
}

/// First action matching `names` in priority order.
///
/// `keyed` narrows same-named overloads: `Some(true)` prefers actions that
/// take the entity key, `Some(false)` those that do not.
fn find_action<'r>(
    controller: Option<&'r ControllerDescriptor>,
    names: &[String],
    keyed: Option<bool>,
    keys: &[String],
) -> Option<&'r ActionDescriptor> {
    let controller = controller?;
    let Some(keyed) = keyed else {
        return controller.find_action(names);
    };
    names.iter().find_map(|name| {
        controller
            .actions
            .iter()
            .filter(|a| &a.name == name)
            .find(|a| takes_key(a, keys) == keyed)
    })
}

fn takes_key(action: &ActionDescriptor, keys: &[String]) -> bool {
    action.parameters.iter().any(|p| {
        p.name.to_ascii_lowercase().starts_with("key")
            || keys.iter().any(|k| k.eq_ignore_ascii_case(&p.name))
    })
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
