// starmap-core - Platform-agnostic categorization logic
//
// Everything in this crate is pure: no I/O, no clocks, no async runtime.
// The upstream collector, the model backends and the HTTP server all build
// on the types defined here.

pub mod batch;
pub mod category;
pub mod complexity;
pub mod error;
pub mod item;
pub mod merge;
pub mod parse;

pub use batch::{partition, Batch};
pub use category::{CategoryMap, UNCATEGORIZED};
pub use complexity::{batch_size, score, ComplexityReport};
pub use error::ParseError;
pub use item::{Item, ItemPage, RawItem, MAX_DESCRIPTION_CHARS, MAX_TOPICS};
pub use merge::{merge, with_uncategorized};
pub use parse::{extract_json_object, parse_category_response};
