//! GitHub starred-repositories source
//!
//! `GET /users/{subject}/starred?per_page=N&page=P` returns a JSON array of
//! repositories. Pagination is advertised through the `Link` response header:
//! `rel="next"` is present while more pages follow and `rel="last"` carries the
//! final page number (GitHub omits it on the last page itself).

use crate::error::UpstreamError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use async_trait::async_trait;
use starmap_core::{ItemPage, RawItem};
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Longest upstream error text carried into an [`UpstreamError`].
const MAX_ERROR_BODY: usize = 256;

/// Anything that can serve one page of a subject's starred repositories.
#[async_trait]
pub trait StarredSource: Send + Sync {
    async fn list_starred(
        &self,
        subject: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ItemPage, UpstreamError>;
}

/// Page numbers extracted from a `Link` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPages {
    pub next: Option<u32>,
    pub last: Option<u32>,
}

/// Parse the `page` query parameter out of each `rel="next"` / `rel="last"`
/// link. Unknown relations and malformed entries are ignored.
pub fn parse_link_header(value: &str) -> LinkPages {
    let mut pages = LinkPages::default();

    for entry in value.split(',') {
        let mut parts = entry.split(';');
        let Some(target) = parts.next() else {
            continue;
        };
        let target = target.trim();
        let Some(target) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            continue;
        };

        let rel = parts.find_map(|param| {
            let (key, value) = param.split_once('=')?;
            (key.trim() == "rel").then(|| value.trim().trim_matches('"').to_string())
        });

        let Some(page) = page_param(target) else {
            continue;
        };

        match rel.as_deref() {
            Some("next") => pages.next = Some(page),
            Some("last") => pages.last = Some(page),
            _ => {}
        }
    }

    pages
}

fn page_param(target: &str) -> Option<u32> {
    let url = Url::parse(target).ok()?;
    let page = url
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok());
    page
}

/// [`StarredSource`] backed by the GitHub REST API.
#[derive(Clone)]
pub struct GithubSource {
    client: Arc<dyn HttpClient>,
    api_base: String,
    token: Option<String>,
}

impl GithubSource {
    pub fn new(client: Arc<dyn HttpClient>, api_base: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_base,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    fn starred_url(&self, subject: &str, page: u32, page_size: u32) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&format!("{}/users/{}/starred", self.api_base, subject))
            .map_err(|e| UpstreamError::Transport(format!("invalid API URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("per_page", &page_size.to_string())
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    fn request(&self, url: &Url) -> HttpRequest {
        HttpRequest::get(url.as_str())
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .bearer(self.token.as_deref())
    }
}

#[async_trait]
impl StarredSource for GithubSource {
    #[instrument(skip(self), fields(api_base = %self.api_base))]
    async fn list_starred(
        &self,
        subject: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ItemPage, UpstreamError> {
        let url = self.starred_url(subject, page, page_size)?;
        let response = self
            .client
            .send(self.request(&url))
            .await
            .map_err(|e| UpstreamError::Transport(format!("{:#}", e)))?;

        if !response.is_success() {
            return Err(classify_failure(subject, &response));
        }

        let items: Vec<RawItem> = response
            .json()
            .map_err(|e| UpstreamError::InvalidResponse(e.to_string()))?;
        let links = response
            .header("link")
            .map(parse_link_header)
            .unwrap_or_default();

        debug!(
            page,
            items = items.len(),
            next = ?links.next,
            last = ?links.last,
            "Fetched starred page"
        );

        Ok(ItemPage {
            items,
            page_number: page,
            has_more: links.next.is_some(),
            last_page: links.last,
        })
    }
}

fn classify_failure(subject: &str, response: &HttpResponse) -> UpstreamError {
    let status = response.status;

    if status == 404 {
        return UpstreamError::NotFound {
            subject: subject.to_string(),
        };
    }

    let exhausted = response.header("x-ratelimit-remaining") == Some("0");
    if status == 429 || (status == 403 && (exhausted || response.header("retry-after").is_some()))
    {
        let reset_at = response
            .header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse().ok());
        return UpstreamError::RateLimited { status, reset_at };
    }

    UpstreamError::Status {
        status,
        message: error_message(response),
    }
}

/// GitHub error bodies are `{"message": "..."}`; fall back to raw text.
fn error_message(response: &HttpResponse) -> String {
    let message = response
        .json::<serde_json::Value>()
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| response.text_excerpt(MAX_ERROR_BODY));
    message.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use anyhow::Result;
    use std::sync::Mutex;

    struct CannedClient {
        response: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl CannedClient {
        fn new(status: u16, headers: &[(&str, &str)], body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: HttpResponse {
                    status,
                    headers: headers
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                    body: body.as_bytes().to_vec(),
                },
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for CannedClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    const LINK: &str = "<https://api.github.com/user/1/starred?per_page=2&page=3>; rel=\"next\", \
                        <https://api.github.com/user/1/starred?per_page=2&page=7>; rel=\"last\", \
                        <https://api.github.com/user/1/starred?per_page=2&page=1>; rel=\"first\"";

    #[test]
    fn parses_next_and_last_pages() {
        let pages = parse_link_header(LINK);
        assert_eq!(pages.next, Some(3));
        assert_eq!(pages.last, Some(7));
    }

    #[test]
    fn ignores_malformed_links() {
        assert_eq!(parse_link_header(""), LinkPages::default());
        assert_eq!(
            parse_link_header("https://x/?page=2; rel=\"next\""),
            LinkPages::default()
        );
        assert_eq!(
            parse_link_header("<https://x/?per_page=5>; rel=\"last\""),
            LinkPages::default()
        );
    }

    #[tokio::test]
    async fn builds_request_and_reads_page() {
        let body = r#"[
            {"full_name": "tokio-rs/tokio", "description": "Runtime", "language": "Rust",
             "topics": ["async"], "stargazers_count": 25000},
            {"full_name": "serde-rs/serde", "description": null, "language": "Rust"}
        ]"#;
        let client = CannedClient::new(200, &[("Link", LINK)], body);
        let source = GithubSource::new(client.clone(), "https://api.github.com/")
            .with_token(Some("secret".into()));

        let page = source.list_starred("octocat", 2, 2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].full_name, "tokio-rs/tokio");
        assert_eq!(page.page_number, 2);
        assert!(page.has_more);
        assert_eq!(page.last_page, Some(7));

        let seen = client.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            "https://api.github.com/users/octocat/starred?per_page=2&page=2"
        );
        assert_eq!(request.header_value("Authorization"), Some("Bearer secret"));
        assert_eq!(request.header_value("Accept"), Some(ACCEPT));
    }

    #[tokio::test]
    async fn last_page_has_no_more() {
        let client = CannedClient::new(200, &[], "[]");
        let source = GithubSource::new(client.clone(), "https://api.github.com")
            .with_token(Some("  ".into()));

        let page = source.list_starred("octocat", 1, 100).await.unwrap();
        assert!(page.is_empty());
        assert!(!page.has_more);
        assert_eq!(page.last_page, None);

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].header_value("Authorization"), None);
    }

    #[tokio::test]
    async fn maps_failure_statuses() {
        let source = GithubSource::new(
            CannedClient::new(404, &[], r#"{"message": "Not Found"}"#),
            "https://api.github.com",
        );
        assert_eq!(
            source.list_starred("ghost", 1, 100).await.unwrap_err(),
            UpstreamError::NotFound {
                subject: "ghost".into()
            }
        );

        let source = GithubSource::new(
            CannedClient::new(
                403,
                &[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", "1700000000")],
                r#"{"message": "API rate limit exceeded"}"#,
            ),
            "https://api.github.com",
        );
        assert_eq!(
            source.list_starred("octocat", 1, 100).await.unwrap_err(),
            UpstreamError::RateLimited {
                status: 403,
                reset_at: Some(1_700_000_000)
            }
        );

        let source = GithubSource::new(
            CannedClient::new(500, &[], r#"{"message": "Server Error"}"#),
            "https://api.github.com",
        );
        assert_eq!(
            source.list_starred("octocat", 1, 100).await.unwrap_err(),
            UpstreamError::Status {
                status: 500,
                message: "Server Error".into()
            }
        );
    }

    #[tokio::test]
    async fn rejects_non_list_body() {
        let source = GithubSource::new(
            CannedClient::new(200, &[], r#"{"unexpected": true}"#),
            "https://api.github.com",
        );
        let err = source.list_starred("octocat", 1, 100).await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidResponse(_)));
    }
}
