//! Parameter binding: assigning each candidate parameter a location.
//!
//! A [`ParameterBinder`] evaluates an ordered chain of [`BindStrategy`]s on
//! every candidate parameter until one returns [`BindOutcome::Bound`]. When
//! all decline, [`DefaultBinding`] decides by placeholder and type, so
//! binding never fails: a missing or ambiguous runtime signature degrades
//! to a best guess instead of aborting generation.

mod strategies;

use std::fmt;
use std::sync::Arc;

use crate::descriptor::{MemberDescriptor, TypeDescriptor};
use crate::discover::{CandidateOperation, CandidateParameter};
use crate::document::ParameterLocation;
use crate::model::{ActionDescriptor, FormalParameter, ParameterSource};
use crate::reflect;

pub use strategies::{
    CaseInsensitiveName, DefaultBinding, Description, ExactName, Position, StructuredParameters,
};

/// Name of the single body parameter that collapses several body values.
pub const COLLAPSED_BODY_NAME: &str = "parameters";

/// A candidate parameter with a resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// Parameter name.
    pub name: String,
    /// Resolved location.
    pub location: ParameterLocation,
    /// Type the schema is built from.
    pub ty: TypeDescriptor,
    /// Whether the caller must supply it.
    pub required: bool,
    /// Documented description from the runtime formal parameter.
    pub description: Option<String>,
}

/// Result of one binding attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum BindOutcome {
    /// The strategy placed the parameter.
    Bound(BoundParameter),
    /// The strategy declined; try the next one.
    Undetermined,
}

/// What a strategy sees while binding one candidate.
#[derive(Debug)]
pub struct BindContext<'a> {
    /// The candidate being bound.
    pub candidate: &'a CandidateOperation,
    /// Its runtime action, when one was found.
    pub action: Option<&'a ActionDescriptor>,
    placeholders: Vec<&'a str>,
}

impl<'a> BindContext<'a> {
    /// Context for `candidate`.
    #[must_use]
    pub fn new(candidate: &'a CandidateOperation) -> Self {
        Self {
            candidate,
            action: candidate.action.as_ref(),
            placeholders: candidate.placeholders(),
        }
    }

    /// Runtime formal parameters; empty without a runtime action.
    #[must_use]
    pub fn formals(&self) -> &'a [FormalParameter] {
        self.action
            .map(|a| a.parameters.as_slice())
            .unwrap_or_default()
    }

    /// Whether `name` is a path-template placeholder.
    #[must_use]
    pub fn is_placeholder(&self, name: &str) -> bool {
        self.placeholders.contains(&name)
    }

    /// Bind `param` against `formal`.
    ///
    /// Structured action-parameter formals keep the candidate's (model)
    /// type; other formals contribute their own type and description.
    #[must_use]
    pub fn bind_to_formal(
        &self,
        param: &CandidateParameter,
        formal: &FormalParameter,
    ) -> BoundParameter {
        let ty = if formal.source == ParameterSource::ActionParameters {
            param.ty.clone()
        } else {
            formal.ty.clone()
        };
        let location = if self.is_placeholder(&param.name) {
            ParameterLocation::Path
        } else {
            match formal.source {
                ParameterSource::Uri => ParameterLocation::Query,
                ParameterSource::Body | ParameterSource::ActionParameters => {
                    ParameterLocation::Body
                }
                ParameterSource::Auto => location_by_type(&ty),
            }
        };
        BoundParameter {
            name: param.name.clone(),
            location,
            required: location == ParameterLocation::Path || (param.required && !formal.optional),
            description: formal.description.clone(),
            ty,
        }
    }
}

pub(crate) fn location_by_type(ty: &TypeDescriptor) -> ParameterLocation {
    if reflect::is_query_primitive(ty) {
        ParameterLocation::Query
    } else {
        ParameterLocation::Body
    }
}

/// One link of the binding chain.
pub trait BindStrategy: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Place `param` (at position `index`) or decline.
    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        index: usize,
    ) -> BindOutcome;
}

/// The ordered strategy chain plus the infallible default.
#[derive(Clone)]
pub struct ParameterBinder {
    strategies: Vec<Arc<dyn BindStrategy>>,
}

impl fmt::Debug for ParameterBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ParameterBinder")
            .field("strategies", &names)
            .finish()
    }
}

impl Default for ParameterBinder {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ParameterBinder {
    /// Built-in chain (exact name, structured parameters, case-insensitive
    /// name, description, position) followed by `extra`.
    #[must_use]
    pub fn new(extra: Vec<Arc<dyn BindStrategy>>) -> Self {
        let mut strategies: Vec<Arc<dyn BindStrategy>> = vec![
            Arc::new(ExactName),
            Arc::new(StructuredParameters),
            Arc::new(CaseInsensitiveName),
            Arc::new(Description),
            Arc::new(Position),
        ];
        strategies.extend(extra);
        Self { strategies }
    }

    /// Bind every parameter of `candidate`.
    ///
    /// Several body parameters collapse into one `parameters` object, and
    /// placeholders without a candidate parameter get a string path
    /// parameter, so path parameters and placeholders always correspond.
    #[must_use]
    pub fn bind(&self, candidate: &CandidateOperation) -> Vec<BoundParameter> {
        let ctx = BindContext::new(candidate);
        let mut bound: Vec<BoundParameter> = candidate
            .parameters
            .iter()
            .enumerate()
            .map(|(index, param)| self.bind_one(&ctx, param, index))
            .collect();

        for placeholder in &ctx.placeholders {
            if !bound.iter().any(|p| p.name == *placeholder) {
                tracing::debug!(
                    path = %candidate.path,
                    placeholder,
                    "placeholder without a parameter, describing as string"
                );
                bound.push(BoundParameter {
                    name: (*placeholder).to_string(),
                    location: ParameterLocation::Path,
                    ty: TypeDescriptor::string(),
                    required: true,
                    description: None,
                });
            }
        }

        collapse_body(bound)
    }

    fn bind_one(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        index: usize,
    ) -> BoundParameter {
        for strategy in &self.strategies {
            if let BindOutcome::Bound(bound) = strategy.try_bind(ctx, param, index) {
                tracing::trace!(
                    parameter = %param.name,
                    strategy = strategy.name(),
                    location = %bound.location,
                    "bound parameter"
                );
                return bound;
            }
        }
        let bound = DefaultBinding.bind(ctx, param);
        tracing::trace!(
            parameter = %param.name,
            strategy = "default",
            location = %bound.location,
            "bound parameter"
        );
        bound
    }
}

/// Merge several body parameters into one inline record named
/// [`COLLAPSED_BODY_NAME`]; path parameters first, then query, then body.
fn collapse_body(bound: Vec<BoundParameter>) -> Vec<BoundParameter> {
    let (bodies, mut rest): (Vec<_>, Vec<_>) = bound
        .into_iter()
        .partition(|p| p.location == ParameterLocation::Body);
    rest.sort_by_key(|p| p.location != ParameterLocation::Path);

    match bodies.len() {
        0 => {}
        1 => rest.extend(bodies),
        _ => {
            let required = bodies.iter().any(|p| p.required);
            let members = bodies
                .into_iter()
                .map(|p| {
                    let member = MemberDescriptor::new(&p.name, p.ty);
                    if p.required {
                        member
                    } else {
                        member.optional()
                    }
                })
                .collect();
            rest.push(BoundParameter {
                name: COLLAPSED_BODY_NAME.to_string(),
                location: ParameterLocation::Body,
                ty: TypeDescriptor::inline(members),
                required,
                description: None,
            });
        }
    }
    rest
}
