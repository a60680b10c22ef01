//! Upstream collection of starred repositories.
//!
//! - [`HttpClient`] abstracts the transport for GitHub and the chat backends,
//!   so tests never touch the network
//! - [`GithubSource`] speaks the GitHub REST pagination protocol
//! - [`Collector`] fetches every page in bounded-concurrency waves and caches
//!   the normalized result

mod collector;
mod error;
mod github;
mod http;

pub use collector::{Collector, CollectorConfig};
pub use error::UpstreamError;
pub use github::{parse_link_header, GithubSource, LinkPages, StarredSource};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, ReqwestHttpClient};

/// Cache key under which a subject's repository list is stored.
pub fn stars_cache_key(subject: &str) -> String {
    format!("stars:{}", subject.to_lowercase())
}
