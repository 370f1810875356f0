//! Document assembly: candidates in, finished [`Document`] out.
//!
//! # Pipeline phases
//!
//! 1. **Bind** every candidate and build its request/response schemas
//! 2. **Operation filters**, in registration order (may rewrite or suppress)
//! 3. **Group** into paths, resolving path+verb conflicts
//! 4. **Document filters**, in registration order
//! 5. **Unique operation ids**: collisions get `_2`, `_3`, ... in output order

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::bind::ParameterBinder;
use crate::config::DocsSettings;
use crate::discover::{CandidateOperation, DiscoverySource, Queryable};
use crate::document::{
    Document, Operation, Parameter, ParameterLocation, PathItem, Response, JSON_MEDIA_TYPE,
};
use crate::error::{Error, Result};
use crate::filter::{FilterOutcome, OperationFilter};
use crate::model::ActionDescriptor;
use crate::schema::SchemaBuilder;
use crate::HttpVerb;

/// A candidate after binding and schema materialization.
///
/// This is what operation filters see and what conflict resolvers choose
/// between.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundOperation {
    /// Path template.
    pub path: String,
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Producing discovery strategy.
    pub source: DiscoverySource,
    /// Owning route.
    pub route_name: String,
    /// Owning container.
    pub container: String,
    /// Accepted system query options.
    pub queryable: Queryable,
    /// The runtime action implementing the operation, when one was found.
    pub action: Option<ActionDescriptor>,
    /// The operation as it will appear in the document.
    pub operation: Operation,
}

impl BoundOperation {
    /// Whether `other` is this operation found a second time: either the
    /// same runtime action, or an identical rendered operation.
    #[must_use]
    pub fn is_same_operation(&self, other: &Self) -> bool {
        let same_action = self.action.is_some()
            && self.action == other.action
            && self.container == other.container;
        same_action || self.operation == other.operation
    }
}

/// Picks one operation among several sharing a path and verb.
pub trait ConflictResolver: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Index of the chosen operation in `candidates`, or `None` to reject
    /// the conflict.
    fn resolve(
        &self,
        path: &str,
        verb: HttpVerb,
        candidates: &[&BoundOperation],
    ) -> Option<usize>;
}

/// Rejects every conflict; the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectConflicts;

impl ConflictResolver for RejectConflicts {
    fn name(&self) -> &str {
        "reject"
    }

    fn resolve(
        &self,
        _path: &str,
        _verb: HttpVerb,
        _candidates: &[&BoundOperation],
    ) -> Option<usize> {
        None
    }
}

/// Chooses the first operation produced by one discovery strategy.
#[derive(Debug, Clone, Copy)]
pub struct PreferSource(pub DiscoverySource);

impl ConflictResolver for PreferSource {
    fn name(&self) -> &str {
        match self.0 {
            DiscoverySource::Model => "prefer-model",
            DiscoverySource::Custom => "prefer-custom",
            DiscoverySource::Attribute => "prefer-attribute",
        }
    }

    fn resolve(
        &self,
        _path: &str,
        _verb: HttpVerb,
        candidates: &[&BoundOperation],
    ) -> Option<usize> {
        candidates.iter().position(|c| c.source == self.0)
    }
}

/// Chooses the first discovered operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstDiscovered;

impl ConflictResolver for FirstDiscovered {
    fn name(&self) -> &str {
        "first"
    }

    fn resolve(
        &self,
        _path: &str,
        _verb: HttpVerb,
        _candidates: &[&BoundOperation],
    ) -> Option<usize> {
        Some(0)
    }
}

/// Assemble `candidates` into a document.
///
/// # Errors
///
/// Returns [`Error::Filter`] when a caller filter fails and
/// [`Error::UnresolvedConflict`] when the conflict resolver rejects a
/// path+verb shared by distinct operations.
pub fn assemble(candidates: &[CandidateOperation], settings: &DocsSettings) -> Result<Document> {
    let mut schemas = SchemaBuilder::new(
        &settings.reflector,
        &settings.custom_mappings,
        settings.include_navigation_properties,
    );

    // --- Phase 1: bind and materialize schemas ---
    // --- Phase 2: operation filters ---
    let mut operations = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut bound = bind_operation(candidate, &settings.binder, &mut schemas);
        if run_operation_filters(&settings.operation_filters, &mut bound)? == FilterOutcome::Keep {
            operations.push(bound);
        } else {
            tracing::debug!(
                path = %bound.path,
                verb = %bound.verb,
                "operation suppressed by filter"
            );
        }
    }

    // --- Phase 3: group into paths ---
    let mut document = Document::new(settings.info.clone());
    document.host.clone_from(&settings.host);
    document.base_path.clone_from(&settings.base_path);
    document.schemes.clone_from(&settings.schemes);
    document.paths = group_paths(operations, settings.conflict_resolver.as_ref())?;
    document.definitions = schemas.into_definitions();

    // --- Phase 4: document filters ---
    for filter in &settings.document_filters {
        filter.apply(&mut document).map_err(|source| Error::Filter {
            filter: filter.name().to_string(),
            source,
        })?;
    }

    // --- Phase 5: unique operation ids ---
    assign_unique_operation_ids(&mut document);

    tracing::info!(
        paths = document.paths.len(),
        operations = document.operations().count(),
        definitions = document.definitions.len(),
        "assembled API description"
    );
    Ok(document)
}

fn bind_operation(
    candidate: &CandidateOperation,
    binder: &ParameterBinder,
    schemas: &mut SchemaBuilder<'_>,
) -> BoundOperation {
    let parameters: Vec<Parameter> = binder
        .bind(candidate)
        .into_iter()
        .map(|p| Parameter {
            schema: schemas.build(&p.ty),
            name: p.name,
            location: p.location,
            description: p.description,
            required: p.required,
        })
        .collect();
    let response_schema = candidate.response_type().map(|ty| schemas.build(ty));

    let consumes = if parameters.iter().any(|p| p.location == ParameterLocation::Body) {
        vec![JSON_MEDIA_TYPE.to_string()]
    } else {
        Vec::new()
    };
    let produces = if response_schema.is_some() {
        vec![JSON_MEDIA_TYPE.to_string()]
    } else {
        Vec::new()
    };

    let status = match (&response_schema, candidate.success_status) {
        (None, 200) => 204,
        (_, status) => status,
    };
    let mut responses = IndexMap::new();
    responses.insert(
        status.to_string(),
        Response {
            description: status_description(status).to_string(),
            schema: response_schema,
        },
    );

    let action = candidate.action.as_ref();
    BoundOperation {
        path: candidate.path.clone(),
        verb: candidate.verb,
        source: candidate.source,
        route_name: candidate.route_name.clone(),
        container: candidate.container.clone(),
        queryable: candidate.queryable,
        action: candidate.action.clone(),
        operation: Operation {
            tags: vec![candidate.container.clone()],
            summary: action.and_then(|a| a.summary.clone()),
            description: action.and_then(|a| a.description.clone()),
            operation_id: candidate.operation_id(),
            consumes,
            produces,
            parameters,
            responses,
            deprecated: action.is_some_and(|a| a.deprecated),
        },
    }
}

fn status_description(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        _ => "Success",
    }
}

fn run_operation_filters(
    filters: &[std::sync::Arc<dyn OperationFilter>],
    operation: &mut BoundOperation,
) -> Result<FilterOutcome> {
    for filter in filters {
        let outcome = filter.apply(operation).map_err(|source| Error::Filter {
            filter: filter.name().to_string(),
            source,
        })?;
        if outcome == FilterOutcome::Suppress {
            return Ok(FilterOutcome::Suppress);
        }
    }
    Ok(FilterOutcome::Keep)
}

fn group_paths(
    operations: Vec<BoundOperation>,
    resolver: &dyn ConflictResolver,
) -> Result<IndexMap<String, PathItem>> {
    let mut groups: IndexMap<(String, HttpVerb), Vec<BoundOperation>> = IndexMap::new();
    for op in operations {
        groups.entry((op.path.clone(), op.verb)).or_default().push(op);
    }

    let mut paths: IndexMap<String, PathItem> = IndexMap::new();
    for ((path, verb), group) in groups {
        let chosen = resolve_group(&path, verb, group, resolver)?;
        paths.entry(path).or_default().insert(verb, chosen.operation);
    }
    Ok(paths)
}

/// One operation for a path+verb.
///
/// The same operation found twice (see [`BoundOperation::is_same_operation`])
/// collapses; everything else, including distinct operations sharing an id,
/// goes to the resolver.
fn resolve_group(
    path: &str,
    verb: HttpVerb,
    group: Vec<BoundOperation>,
    resolver: &dyn ConflictResolver,
) -> Result<BoundOperation> {
    let mut distinct: Vec<BoundOperation> = Vec::with_capacity(group.len());
    for op in group {
        if distinct.iter().any(|d| d.is_same_operation(&op)) {
            tracing::debug!(
                path,
                %verb,
                operation_id = %op.operation.operation_id,
                source = %op.source,
                "collapsed duplicate operation"
            );
        } else {
            distinct.push(op);
        }
    }
    if distinct.len() == 1 {
        if let Some(op) = distinct.pop() {
            return Ok(op);
        }
    }

    let refs: Vec<&BoundOperation> = distinct.iter().collect();
    match resolver.resolve(path, verb, &refs) {
        Some(index) if index < distinct.len() => {
            let chosen = distinct.swap_remove(index);
            tracing::debug!(
                path,
                %verb,
                resolver = resolver.name(),
                operation_id = %chosen.operation.operation_id,
                "resolved conflicting operations"
            );
            Ok(chosen)
        }
        _ => Err(Error::UnresolvedConflict {
            path: path.to_string(),
            verb,
            operation_ids: distinct
                .iter()
                .map(|d| d.operation.operation_id.clone())
                .collect(),
        }),
    }
}

fn assign_unique_operation_ids(document: &mut Document) {
    let mut used: HashSet<String> = HashSet::new();
    for item in document.paths.values_mut() {
        for verb in HttpVerb::ALL {
            let Some(op) = item.operation_mut(verb) else {
                continue;
            };
            let base = op.operation_id.clone();
            let mut id = base.clone();
            let mut n = 1;
            while !used.insert(id.clone()) {
                n += 1;
                id = format!("{base}_{n}");
            }
            op.operation_id = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn bound(path: &str, verb: HttpVerb, source: DiscoverySource, id: &str) -> BoundOperation {
        BoundOperation {
            path: path.to_string(),
            verb,
            source,
            route_name: "odata".to_string(),
            container: "X".to_string(),
            queryable: Queryable::None,
            action: None,
            operation: Operation {
                operation_id: id.to_string(),
                ..Operation::default()
            },
        }
    }

    #[test]
    fn same_id_duplicates_collapse() {
        let paths = group_paths(
            vec![
                bound("/X", HttpVerb::Get, DiscoverySource::Model, "X_Get"),
                bound("/X", HttpVerb::Get, DiscoverySource::Attribute, "X_Get"),
            ],
            &RejectConflicts,
        )
        .unwrap();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn same_id_with_different_parameters_is_a_conflict() {
        let mut with_term = bound("/X", HttpVerb::Get, DiscoverySource::Attribute, "X_Search");
        with_term.operation.parameters.push(Parameter {
            name: "term".to_string(),
            location: ParameterLocation::Query,
            description: None,
            required: true,
            schema: crate::schema::Schema::primitive("string", None),
        });
        let err = group_paths(
            vec![
                bound("/X", HttpVerb::Get, DiscoverySource::Attribute, "X_Search"),
                with_term,
            ],
            &RejectConflicts,
        )
        .unwrap_err();
        match err {
            Error::UnresolvedConflict { operation_ids, .. } => {
                assert_eq!(operation_ids, vec!["X_Search", "X_Search"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_runtime_action_from_two_strategies_collapses() {
        let action = ActionDescriptor::new("GetX");
        let mut from_model = bound("/X", HttpVerb::Get, DiscoverySource::Model, "X_GetX");
        from_model.action = Some(action.clone());
        from_model.operation.summary = Some("from the model".to_string());
        let mut from_attribute = bound("/X", HttpVerb::Get, DiscoverySource::Attribute, "X_GetX");
        from_attribute.action = Some(action);

        let paths = group_paths(vec![from_model, from_attribute], &RejectConflicts).unwrap();
        let kept = paths["/X"].operation(HttpVerb::Get).unwrap();
        assert_eq!(kept.summary.as_deref(), Some("from the model"));
    }

    #[test]
    fn distinct_ids_rejected_by_default() {
        let err = group_paths(
            vec![
                bound("/X", HttpVerb::Get, DiscoverySource::Model, "X_Get"),
                bound("/X", HttpVerb::Get, DiscoverySource::Attribute, "X_List"),
            ],
            &RejectConflicts,
        )
        .unwrap_err();
        match err {
            Error::UnresolvedConflict { operation_ids, .. } => {
                assert_eq!(operation_ids, vec!["X_Get", "X_List"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn prefer_source_picks_matching_strategy() {
        let paths = group_paths(
            vec![
                bound("/X", HttpVerb::Get, DiscoverySource::Model, "X_Get"),
                bound("/X", HttpVerb::Get, DiscoverySource::Attribute, "X_List"),
            ],
            &PreferSource(DiscoverySource::Attribute),
        )
        .unwrap();
        assert_eq!(
            paths["/X"].operation(HttpVerb::Get).unwrap().operation_id,
            "X_List"
        );
    }

    #[test]
    fn out_of_range_choice_is_a_rejection() {
        struct Broken;
        impl ConflictResolver for Broken {
            fn resolve(&self, _: &str, _: HttpVerb, _: &[&BoundOperation]) -> Option<usize> {
                Some(7)
            }
        }
        let result = group_paths(
            vec![
                bound("/X", HttpVerb::Get, DiscoverySource::Model, "A"),
                bound("/X", HttpVerb::Get, DiscoverySource::Model, "B"),
            ],
            &Broken,
        );
        assert!(matches!(result, Err(Error::UnresolvedConflict { .. })));
    }

    #[test]
    fn operation_ids_made_unique_in_output_order() {
        use DiscoverySource::Model;

        let mut document = Document::new(crate::document::Info::default());
        document.paths = group_paths(
            vec![
                bound("/odata/v1/Customers", HttpVerb::Get, Model, "Customers_Get"),
                bound("/odata/v1/Customers", HttpVerb::Post, Model, "Customers_Post"),
                bound("/odata/v2/Customers", HttpVerb::Get, Model, "Customers_Get"),
                bound("/odata/v3/Customers", HttpVerb::Get, Model, "Customers_Get"),
            ],
            &RejectConflicts,
        )
        .unwrap();
        assign_unique_operation_ids(&mut document);

        let ids: Vec<&str> = document
            .operations()
            .map(|(_, _, op)| op.operation_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["Customers_Get", "Customers_Post", "Customers_Get_2", "Customers_Get_3"]
        );
    }
}
