//! Operation and document filter pipelines.
//!
//! Filters run in the order they were registered. Operation filters see
//! each [`BoundOperation`] before it is grouped into paths and may rewrite
//! or suppress it; document filters see the whole [`Document`]. A filter
//! error aborts generation and reaches the caller as
//! [`Error::Filter`](crate::Error::Filter).

mod query;

use crate::assemble::BoundOperation;
use crate::document::Document;

pub use query::EnableQueryFilter;

/// Error type returned by caller-supplied filters.
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

/// Whether an operation survives an operation filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Keep the (possibly modified) operation.
    Keep,
    /// Drop the operation from the document.
    Suppress,
}

/// Rewrites or suppresses single operations.
pub trait OperationFilter: Send + Sync {
    /// Name reported in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Inspect or modify `operation`.
    ///
    /// # Errors
    ///
    /// Any error aborts document generation.
    fn apply(&self, operation: &mut BoundOperation) -> Result<FilterOutcome, FilterError>;
}

/// Rewrites the whole document (paths, definitions, global metadata).
pub trait DocumentFilter: Send + Sync {
    /// Name reported in errors and logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Inspect or modify `document`.
    ///
    /// # Errors
    ///
    /// Any error aborts document generation.
    fn apply(&self, document: &mut Document) -> Result<(), FilterError>;
}

/// A named closure usable as either filter kind.
///
/// # Example
///
/// ```ignore
/// let set_host = FnFilter::document("set-host", |doc| {
///     doc.host = Some("foo".to_string());
///     Ok(())
/// });
/// ```
pub struct FnFilter<F> {
    name: String,
    f: F,
}

impl<F> std::fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFilter").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> FnFilter<F>
where
    F: Fn(&mut BoundOperation) -> Result<FilterOutcome, FilterError> + Send + Sync,
{
    /// Operation filter named `name`.
    pub fn operation(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> FnFilter<F>
where
    F: Fn(&mut Document) -> Result<(), FilterError> + Send + Sync,
{
    /// Document filter named `name`.
    pub fn document(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> OperationFilter for FnFilter<F>
where
    F: Fn(&mut BoundOperation) -> Result<FilterOutcome, FilterError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, operation: &mut BoundOperation) -> Result<FilterOutcome, FilterError> {
        (self.f)(operation)
    }
}

impl<F> DocumentFilter for FnFilter<F>
where
    F: Fn(&mut Document) -> Result<(), FilterError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, document: &mut Document) -> Result<(), FilterError> {
        (self.f)(document)
    }
}
