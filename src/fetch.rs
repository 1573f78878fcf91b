//! Outbound HTTP access to the pages being proxied.
//!
//! The gate only needs three things from an upstream response: its declared
//! content type, its raw bytes, and its decoded text. [`Upstream`] captures
//! that so tests can substitute a [`Fetcher`] that never touches the network.

use std::future::Future;

use axum::body::Bytes;
use url::Url;

use crate::error::Result;

/// `User-Agent` sent upstream; mobile layouts carry fewer ads.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X)";

/// A response received from the upstream server, body not yet read.
pub trait Upstream: Send {
    /// The declared `Content-Type`, if any.
    fn content_type(&self) -> Option<&str>;

    /// Read the whole body as raw bytes.
    fn into_bytes(self) -> impl Future<Output = Result<Bytes>> + Send;

    /// Read the whole body as text, honoring the declared charset.
    fn into_text(self) -> impl Future<Output = Result<String>> + Send;
}

/// Capability to issue the outbound `GET` for a target url.
///
/// # Example
///
/// ```rust,no_run
/// use manga_proxy::{Fetcher, HttpFetcher, Upstream};
///
/// # async fn example() -> manga_proxy::Result<()> {
/// let fetcher = HttpFetcher::new()?;
/// let url = url::Url::parse("https://example.com/").unwrap();
/// let response = fetcher.fetch(&url).await?;
/// println!("{:?}", response.content_type());
/// # Ok(())
/// # }
/// ```
pub trait Fetcher: Send + Sync + 'static {
    type Response: Upstream;

    /// Send the request and wait for the response head.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<Self::Response>> + Send;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
///
/// No timeout and no retry are configured: a slow upstream stalls only the
/// request waiting on it.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher identifying itself with [`MOBILE_USER_AGENT`].
    pub fn new() -> Result<Self> {
        Self::with_user_agent(MOBILE_USER_AGENT)
    }

    /// Create a fetcher sending the given `User-Agent`.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    type Response = reqwest::Response;

    async fn fetch(&self, url: &Url) -> Result<reqwest::Response> {
        let response = self.client.get(url.as_str()).send().await?;
        tracing::debug!("Upstream {} answered {}", url, response.status());
        Ok(response)
    }
}

impl Upstream for reqwest::Response {
    fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    async fn into_bytes(self) -> Result<Bytes> {
        Ok(self.bytes().await?)
    }

    async fn into_text(self) -> Result<String> {
        Ok(self.text().await?)
    }
}
