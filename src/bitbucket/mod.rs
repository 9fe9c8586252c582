pub mod diff;
pub mod error;
pub mod types;

pub use error::{classify, BitbucketError};
pub use types::{Comment, Page, PullRequest, PullRequestRef, Task};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Largest `pagelen` Bitbucket accepts on list endpoints.
pub const MAX_PAGE_LEN: usize = 100;

/// Everything the client needs besides the HTTP stack.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub credentials: Credentials,
    pub default_workspace: Option<String>,
    pub base_url: String,
}

/// Authenticated Bitbucket Cloud REST client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: reqwest::Client,
    credentials: Credentials,
    default_workspace: Option<String>,
    base_url: String,
}

impl BitbucketClient {
    pub fn new(settings: ClientSettings) -> Result<Self, BitbucketError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bitbucket-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BitbucketError::Client(e.to_string()))?;

        Ok(Self {
            http,
            credentials: settings.credentials,
            default_workspace: settings.default_workspace.filter(|w| !w.is_empty()),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Pick the explicit workspace, falling back to the configured default.
    /// Fails before any request is made when neither is set.
    pub fn resolve_workspace(&self, workspace: Option<&str>) -> Result<String, BitbucketError> {
        workspace
            .filter(|w| !w.is_empty())
            .or(self.default_workspace.as_deref())
            .map(str::to_string)
            .ok_or(BitbucketError::MissingWorkspace)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn authed(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.credentials.email, Some(&self.credentials.api_token))
    }

    /// Issue one JSON request and decode the response body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, BitbucketError> {
        let url = self.url(path);
        let context = format!("{} {}", method, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .authed(method, &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BitbucketError::transport(&context, e))?;
        let response = check_status(response, &context).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BitbucketError::transport(&context, e))?;
        serde_json::from_slice(&bytes).map_err(|e| BitbucketError::Decode {
            context,
            message: e.to_string(),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BitbucketError> {
        self.request(Method::GET, path, None).await
    }

    /// Fetch a plain-text resource such as a pull request diff.
    pub async fn request_raw(&self, path: &str) -> Result<String, BitbucketError> {
        let url = self.url(path);
        let context = format!("GET {}", path);
        debug!("GET (text) {}", url);

        let response = self
            .authed(Method::GET, &url)
            .header(ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| BitbucketError::transport(&context, e))?;
        let response = check_status(response, &context).await?;
        response
            .text()
            .await
            .map_err(|e| BitbucketError::transport(&context, e))
    }

    /// Follow `next` cursors from `path` until `limit` items are collected or
    /// the listing ends. Never returns more than `limit` items.
    #[instrument(skip(self), level = "debug")]
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        path: &str,
        limit: usize,
    ) -> Result<Vec<T>, BitbucketError> {
        let mut results: Vec<T> = Vec::new();
        if limit == 0 {
            return Ok(results);
        }

        let separator = if path.contains('?') { '&' } else { '?' };
        let page_len = limit.min(MAX_PAGE_LEN);
        let mut next = Some(format!("{}{}{}pagelen={}", self.base_url, path, separator, page_len));

        while let Some(url) = next.take() {
            if results.len() >= limit {
                break;
            }
            let page: Page<T> = self.get(&url).await?;
            debug!(items = page.values.len(), has_next = page.next.is_some(), "received page");
            results.extend(page.values);
            next = page.next;
        }

        results.truncate(limit);
        Ok(results)
    }
}

async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, BitbucketError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BitbucketError::Api {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        body,
        context: context.to_string(),
    })
}
