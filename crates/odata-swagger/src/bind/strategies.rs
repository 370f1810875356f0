//! Built-in binding strategies, in chain order.

use crate::bind::{location_by_type, BindContext, BindOutcome, BindStrategy, BoundParameter};
use crate::discover::{CandidateParameter, Provenance};
use crate::document::ParameterLocation;
use crate::model::ParameterSource;

/// Formal parameter with exactly the candidate's name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactName;

impl BindStrategy for ExactName {
    fn name(&self) -> &str {
        "exact-name"
    }

    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        _index: usize,
    ) -> BindOutcome {
        match ctx.formals().iter().find(|f| f.name == param.name) {
            Some(formal) => BindOutcome::Bound(ctx.bind_to_formal(param, formal)),
            None => BindOutcome::Undetermined,
        }
    }
}

/// Operation parameters of an action that receives them as one structured
/// object: they travel together in the body, under the candidate's type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredParameters;

impl BindStrategy for StructuredParameters {
    fn name(&self) -> &str {
        "structured-parameters"
    }

    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        _index: usize,
    ) -> BindOutcome {
        if param.provenance != Provenance::Operation {
            return BindOutcome::Undetermined;
        }
        match ctx
            .formals()
            .iter()
            .find(|f| f.source == ParameterSource::ActionParameters)
        {
            Some(formal) => BindOutcome::Bound(ctx.bind_to_formal(param, formal)),
            None => BindOutcome::Undetermined,
        }
    }
}

/// Name match ignoring ASCII case and a leading `@` or `$`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveName;

impl BindStrategy for CaseInsensitiveName {
    fn name(&self) -> &str {
        "case-insensitive-name"
    }

    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        _index: usize,
    ) -> BindOutcome {
        let wanted = normalize(&param.name);
        match ctx
            .formals()
            .iter()
            .find(|f| normalize(&f.name).eq_ignore_ascii_case(wanted))
        {
            Some(formal) => BindOutcome::Bound(ctx.bind_to_formal(param, formal)),
            None => BindOutcome::Undetermined,
        }
    }
}

fn normalize(name: &str) -> &str {
    name.trim_start_matches(['@', '$'])
}

/// Formal whose documented description equals the candidate's name.
///
/// Covers parameters renamed between the model and the implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Description;

impl BindStrategy for Description {
    fn name(&self) -> &str {
        "description"
    }

    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        _index: usize,
    ) -> BindOutcome {
        match ctx.formals().iter().find(|f| {
            f.description
                .as_deref()
                .is_some_and(|d| d.trim().eq_ignore_ascii_case(&param.name))
        }) {
            Some(formal) => BindOutcome::Bound(ctx.bind_to_formal(param, formal)),
            None => BindOutcome::Undetermined,
        }
    }
}

/// Formal at the candidate's position; assumes declaration order agrees.
///
/// Declines structured action-parameter formals, which never stand for a
/// single positional value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position;

impl BindStrategy for Position {
    fn name(&self) -> &str {
        "position"
    }

    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        index: usize,
    ) -> BindOutcome {
        match ctx.formals().get(index) {
            Some(formal) if formal.source != ParameterSource::ActionParameters => {
                BindOutcome::Bound(ctx.bind_to_formal(param, formal))
            }
            _ => BindOutcome::Undetermined,
        }
    }
}

/// Last resort, always succeeds: placeholders go in the path, primitive and
/// enum values in the query, everything else in the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBinding;

impl DefaultBinding {
    /// Place `param` without a runtime formal.
    #[must_use]
    pub fn bind(self, ctx: &BindContext<'_>, param: &CandidateParameter) -> BoundParameter {
        let location = if ctx.is_placeholder(&param.name) {
            ParameterLocation::Path
        } else {
            location_by_type(&param.ty)
        };
        BoundParameter {
            name: param.name.clone(),
            location,
            ty: param.ty.clone(),
            required: location == ParameterLocation::Path || param.required,
            description: None,
        }
    }
}

impl BindStrategy for DefaultBinding {
    fn name(&self) -> &str {
        "default"
    }

    fn try_bind(
        &self,
        ctx: &BindContext<'_>,
        param: &CandidateParameter,
        _index: usize,
    ) -> BindOutcome {
        BindOutcome::Bound(self.bind(ctx, param))
    }
}
