//! Typed error enum for the `odata-swagger` library API.
//!
//! Library consumers can match on specific variants. The CLI (`main.rs`)
//! converts these to `anyhow::Error` at the binary boundary for richer
//! context messages.

use crate::filter::FilterError;
use crate::HttpVerb;

/// Errors produced by `odata-swagger` library operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File I/O failure (reading config or route-table files).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON parsing or serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// No loaded type has the requested fully-qualified name.
    #[error("type '{full_name}' not found in any loaded type source")]
    TypeNotFound {
        /// The unresolved fully-qualified type name.
        full_name: String,
    },

    /// Several operations share a path and verb and the configured
    /// conflict resolver did not pick one.
    ///
    /// Register a resolver via `DocsConfig::conflict_resolver` (or set
    /// `conflict_policy` in the project config) to choose explicitly.
    #[error(
        "conflicting operations for {verb} {path}: {operation_ids:?}; \
         configure a conflict resolver to choose one"
    )]
    UnresolvedConflict {
        /// Path template shared by the conflicting operations.
        path: String,
        /// Verb shared by the conflicting operations.
        verb: HttpVerb,
        /// Operation ids of every conflicting candidate, in discovery order.
        operation_ids: Vec<String>,
    },

    /// A caller-supplied operation or document filter failed.
    #[error("filter '{filter}' failed: {source}")]
    Filter {
        /// Filter name.
        filter: String,
        /// The error returned by the filter.
        #[source]
        source: FilterError,
    },
}

/// Convenience alias used throughout the library's public API.
pub type Result<T> = std::result::Result<T, Error>;
