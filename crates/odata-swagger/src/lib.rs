#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assemble;
pub mod bind;
mod cache;
mod config;
pub mod discover;
pub mod document;
mod error;
pub mod filter;
mod provider;
pub mod reflect;
pub mod schema;

pub use odata_swagger_core::{descriptor, model};

pub use assemble::{
    assemble, BoundOperation, ConflictResolver, FirstDiscovered, PreferSource, RejectConflicts,
};
pub use cache::DocumentCache;
pub use config::{
    ConflictPolicy, DocsConfig, DocsSettings, ProjectConfig, PropertyNaming, DECIMAL_TYPE,
};
pub use discover::{CandidateOperation, CustomRoute, DiscoverySource, DiscoveryStrategy};
pub use document::{Document, Info, Operation, Parameter, ParameterLocation, PathItem};
pub use error::{Error, Result};
pub use filter::{DocumentFilter, FilterError, FilterOutcome, FnFilter, OperationFilter};
pub use model::{HttpVerb, RouteTable};
pub use provider::SwaggerProvider;
pub use schema::Schema;
