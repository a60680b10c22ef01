//! Request handling for starmap
//!
//! This crate ties the collector, the categorizer and the shared caches into
//! one [`Pipeline`] and defines the response and error shapes every surface
//! (HTTP server, CLI) returns.

pub mod error;
pub mod pipeline;
pub mod response;
pub mod subject;

pub use error::StarmapError;
pub use pipeline::{categories_cache_key, Pipeline, PipelineConfig};
pub use response::{CategorizeResponse, ErrorEnvelope, NoItemsResponse, Outcome};
pub use subject::validate_subject;
