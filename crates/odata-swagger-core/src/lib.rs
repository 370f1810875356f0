//! Shared type descriptors and metadata-model types for the odata-swagger ecosystem.
//!
//! This crate describes the *inputs* of document generation: structural type
//! descriptors (instead of runtime reflection), the metadata model (entity
//! sets, keys, bound/unbound operations), and the runtime action descriptors
//! exposed by controllers. All types derive `serde` traits so a route table
//! can be loaded from YAML or JSON.
//!
//! You should not need to depend on this crate directly; use `odata-swagger`,
//! which re-exports everything here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod descriptor;
pub mod model;
