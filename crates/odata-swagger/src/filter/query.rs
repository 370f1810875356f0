//! OData system query options for queryable GET operations.

use crate::assemble::BoundOperation;
use crate::discover::Queryable;
use crate::document::{Parameter, ParameterLocation};
use crate::filter::{FilterError, FilterOutcome, OperationFilter};
use crate::schema::Schema;
use crate::HttpVerb;

/// `(name, type, format, description)` of each option.
type QueryOption = (&'static str, &'static str, Option<&'static str>, &'static str);

const COLLECTION_OPTIONS: &[QueryOption] = &[
    ("$filter", "string", None, "Filters the results, based on a Boolean condition."),
    ("$orderby", "string", None, "Sorts the results."),
    ("$top", "integer", Some("int32"), "Returns only the first n results."),
    ("$skip", "integer", Some("int32"), "Skips the first n results."),
    ("$count", "boolean", None, "Includes a count of the matching results in the response."),
    ("$select", "string", None, "Selects which properties to include in the response."),
    ("$expand", "string", None, "Expands related entities inline."),
];

const SINGLE_OPTIONS: &[QueryOption] = &[
    ("$select", "string", None, "Selects which properties to include in the response."),
    ("$expand", "string", None, "Expands related entities inline."),
];

/// Adds optional query parameters for the system query options an
/// operation accepts. Always the last operation filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnableQueryFilter;

impl OperationFilter for EnableQueryFilter {
    fn name(&self) -> &str {
        "enable-query"
    }

    fn apply(&self, operation: &mut BoundOperation) -> Result<FilterOutcome, FilterError> {
        if operation.verb != HttpVerb::Get {
            return Ok(FilterOutcome::Keep);
        }
        let options = match operation.queryable {
            Queryable::None => return Ok(FilterOutcome::Keep),
            Queryable::Collection => COLLECTION_OPTIONS,
            Queryable::Single => SINGLE_OPTIONS,
        };

        let params = &mut operation.operation.parameters;
        for &(name, schema_type, format, description) in options {
            if params.iter().any(|p| p.name == name) {
                continue;
            }
            params.push(Parameter {
                name: name.to_string(),
                location: ParameterLocation::Query,
                description: Some(description.to_string()),
                required: false,
                schema: Schema::primitive(schema_type, format),
            });
        }
        Ok(FilterOutcome::Keep)
    }
}
