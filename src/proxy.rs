//! The fetch gate and the rewrite-and-cache engine.

use axum::body::Bytes;
use url::Url;

use crate::blocklist::Blocklist;
use crate::cache::PageCache;
use crate::error::{ProxyError, Result};
use crate::fetch::{Fetcher, Upstream};
use crate::sanitizer::SanitizerPipeline;

/// Content type used when the upstream declares none.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Body of every failure response.
pub const FAILURE_MESSAGE: &str = "Erro ao carregar a página.";

/// Outcome of proxying one target url.
#[derive(Debug)]
pub enum ProxyResponse {
    /// The target matched the blocklist; answered with an empty body.
    Blocked,
    /// Rewritten HTML, either fresh or from the cache.
    Page(String),
    /// A non-HTML upstream body, returned untouched.
    Passthrough { content_type: String, body: Bytes },
    /// Something went wrong; the caller only ever sees [`FAILURE_MESSAGE`].
    Failed,
}

/// A reader proxy: blocklist, cache, upstream fetch and HTML rewriting.
///
/// Build one with [`ProxyBuilder`](crate::ProxyBuilder).
pub struct MangaProxy<F: Fetcher, C: PageCache> {
    fetcher: F,
    cache: C,
    blocklist: Blocklist,
    pipeline: SanitizerPipeline,
    route: String,
}

impl<F: Fetcher, C: PageCache> MangaProxy<F, C> {
    pub(crate) fn new(
        fetcher: F,
        cache: C,
        blocklist: Blocklist,
        pipeline: SanitizerPipeline,
        route: String,
    ) -> Self {
        Self {
            fetcher,
            cache,
            blocklist,
            pipeline,
            route,
        }
    }

    /// Path the proxy is mounted on.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// The page cache shared by all requests.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Serve a request for `target`, folding every error into
    /// [`ProxyResponse::Failed`] after logging it.
    pub async fn handle(&self, target: Option<&str>) -> ProxyResponse {
        match self.try_handle(target).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(stage = %e.stage(), target = ?target, "{e}");
                ProxyResponse::Failed
            }
        }
    }

    /// Serve a request for `target`, surfacing the error that aborted it.
    pub async fn try_handle(&self, target: Option<&str>) -> Result<ProxyResponse> {
        let target = target.ok_or(ProxyError::MissingTarget)?;

        if self.blocklist.is_blocked(target) {
            tracing::warn!("Blocked {target}");
            return Ok(ProxyResponse::Blocked);
        }

        if let Some(page) = self.cache.get(target).await {
            tracing::debug!("Cache hit for {target}");
            return Ok(ProxyResponse::Page(page));
        }

        let url = Url::parse(target)?;
        let upstream = self.fetcher.fetch(&url).await?;

        let declared = upstream.content_type().map(str::to_owned);
        match declared {
            Some(ct) if ct.contains("text/html") => {
                let html = upstream.into_text().await?;
                let page = self.render(&html, target).await?;
                Ok(ProxyResponse::Page(page))
            }
            declared => {
                let content_type =
                    declared.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
                let body = upstream.into_bytes().await?;
                tracing::debug!("Passing through {} bytes of {content_type}", body.len());
                Ok(ProxyResponse::Passthrough { content_type, body })
            }
        }
    }

    /// Rewrite `html` fetched from `target`, cache the result under `target`
    /// and return it.
    ///
    /// Nothing is cached if any step fails.
    pub async fn render(&self, html: &str, target: &str) -> Result<String> {
        let url = Url::parse(target)?;
        let page = self.pipeline.rewrite(html, &url)?;
        self.cache.set(target, page.clone()).await;
        tracing::debug!("Cached {} bytes for {target}", page.len());
        Ok(page)
    }
}
