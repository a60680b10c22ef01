//! Process-wide shared state for the categorization pipeline.
//!
//! Both types here are constructed once per process and handed to each
//! pipeline run by reference:
//!
//! - [`TtlCache`] stores repository lists and category maps with lazy expiry
//! - [`RequestCoalescer`] lets concurrent identical requests share one run

mod coalesce;
mod ttl;

pub use coalesce::{CoalesceError, RequestCoalescer};
pub use ttl::{Clock, ManualClock, SystemClock, TtlCache};
