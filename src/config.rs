//! Builder for assembling a [`MangaProxy`], plus process settings read from
//! the environment.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::blocklist::{Blocklist, DEFAULT_BLOCKED};
use crate::cache::{MemoryCache, PageCache};
use crate::error::{ProxyError, Result};
use crate::fetch::Fetcher;
use crate::proxy::MangaProxy;
use crate::sanitizer::{
    DEFAULT_AD_SELECTOR, DEFAULT_SCRIPT_NEEDLES, LinkRewriter, Sanitizer, SanitizerPipeline,
    ScriptSanitizer, SelectorSanitizer,
};

/// Route the proxy answers on when none is configured.
pub const DEFAULT_ROUTE: &str = "/read";

/// Port bound when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Builder for configuring a [`MangaProxy`].
///
/// Defaults reproduce the stock reader: `/read` route, a 300 second
/// [`MemoryCache`], the ad/tracking blocklist, popup script needles and the
/// ad element selector.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use manga_proxy::{HttpFetcher, ProxyBuilder};
///
/// # fn example() -> manga_proxy::Result<()> {
/// let proxy = ProxyBuilder::new(HttpFetcher::new()?)
///     .route("/proxy")
///     .cache_ttl(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ProxyBuilder<F: Fetcher, C: PageCache = MemoryCache> {
    fetcher: F,
    cache: C,
    route: String,
    blocked: Vec<String>,
    script_needles: Vec<String>,
    ad_selector: String,
    extra: Vec<Box<dyn Sanitizer>>,
}

impl<F: Fetcher> ProxyBuilder<F, MemoryCache> {
    /// Create a new builder around the given fetcher with default settings.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: MemoryCache::default(),
            route: DEFAULT_ROUTE.to_string(),
            blocked: DEFAULT_BLOCKED.iter().map(|s| s.to_string()).collect(),
            script_needles: DEFAULT_SCRIPT_NEEDLES.iter().map(|s| s.to_string()).collect(),
            ad_selector: DEFAULT_AD_SELECTOR.to_string(),
            extra: Vec::new(),
        }
    }

    /// Replace the in-memory cache with one using the given TTL.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = MemoryCache::new(ttl);
        self
    }
}

impl<F: Fetcher, C: PageCache> ProxyBuilder<F, C> {
    /// Use a different [`PageCache`] implementation.
    pub fn cache<C2: PageCache>(self, cache: C2) -> ProxyBuilder<F, C2> {
        ProxyBuilder {
            fetcher: self.fetcher,
            cache,
            route: self.route,
            blocked: self.blocked,
            script_needles: self.script_needles,
            ad_selector: self.ad_selector,
            extra: self.extra,
        }
    }

    /// Path the proxy is mounted on; rewritten links point here.
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Replace the blocklisted url substrings.
    pub fn blocked<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blocked = needles.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the inline script fragments that get a script removed.
    pub fn script_needles<I, S>(mut self, needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script_needles = needles.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the CSS selector for ad elements.
    pub fn ad_selector(mut self, selector: impl Into<String>) -> Self {
        self.ad_selector = selector.into();
        self
    }

    /// Append a custom [`Sanitizer`] that runs after attribute stripping and
    /// before link rewriting.
    pub fn add_sanitizer(mut self, sanitizer: impl Sanitizer + 'static) -> Self {
        self.extra.push(Box::new(sanitizer));
        self
    }

    /// Validate the configuration and assemble the proxy.
    pub fn build(self) -> Result<MangaProxy<F, C>> {
        if !self.route.starts_with('/') {
            return Err(ProxyError::Config(format!(
                "route must start with `/`, got `{}`",
                self.route
            )));
        }

        let blocklist = Blocklist::new(&self.blocked)?;

        let mut pipeline = SanitizerPipeline::new();
        pipeline.add(ScriptSanitizer::new(self.script_needles)?);
        pipeline.add(SelectorSanitizer::ad_rules(&self.ad_selector)?);
        for sanitizer in self.extra {
            pipeline.push_boxed(sanitizer);
        }
        pipeline.add(LinkRewriter::new(self.route.clone())?);

        Ok(MangaProxy::new(
            self.fetcher,
            self.cache,
            blocklist,
            pipeline,
            self.route,
        ))
    }
}

/// Log output format for the binary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("pretty") {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Process-level settings taken from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Address the HTTP listener binds to.
    pub listen_addr: SocketAddr,
    /// `LOG_FORMAT`: `json` (default) or `pretty`.
    pub log_format: LogFormat,
}

impl Settings {
    /// Read `PORT` and `LOG_FORMAT`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(env::var("PORT").ok(), env::var("LOG_FORMAT").ok())
    }

    fn from_vars(port: Option<String>, log_format: Option<String>) -> Result<Self> {
        let port = match port.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PORT,
            Some(raw) => raw
                .parse()
                .map_err(|_| ProxyError::Config(format!("PORT must be a valid port, got `{raw}`")))?,
        };

        Ok(Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            log_format: log_format
                .as_deref()
                .map(LogFormat::from_str)
                .unwrap_or(LogFormat::Json),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpFetcher;

    #[test]
    fn default_settings() {
        let settings = Settings::from_vars(None, None).unwrap();
        assert_eq!(settings.listen_addr.port(), 3000);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn port_from_env_value() {
        let settings = Settings::from_vars(Some("8080".into()), Some("PRETTY".into())).unwrap();
        assert_eq!(settings.listen_addr.port(), 8080);
        assert_eq!(settings.log_format, LogFormat::Pretty);
    }

    #[test]
    fn empty_port_falls_back_to_default() {
        let settings = Settings::from_vars(Some(" ".into()), None).unwrap();
        assert_eq!(settings.listen_addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn invalid_port_is_config_error() {
        let err = Settings::from_vars(Some("eighty".into()), None).unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }

    #[test]
    fn builder_defaults() {
        let proxy = ProxyBuilder::new(HttpFetcher::new().unwrap())
            .build()
            .unwrap();
        assert_eq!(proxy.route(), "/read");
        assert_eq!(proxy.cache().ttl(), Duration::from_secs(300));
    }

    #[test]
    fn builder_rejects_relative_route() {
        let result = ProxyBuilder::new(HttpFetcher::new().unwrap())
            .route("read")
            .build();
        assert!(matches!(result, Err(ProxyError::Config(_))));
    }

    #[test]
    fn builder_rejects_bad_selector() {
        let result = ProxyBuilder::new(HttpFetcher::new().unwrap())
            .ad_selector("[[[")
            .build();
        assert!(matches!(result, Err(ProxyError::Selector { .. })));
    }

    #[test]
    fn builder_swaps_cache() {
        let proxy = ProxyBuilder::new(HttpFetcher::new().unwrap())
            .cache(crate::cache::NoopCache)
            .route("/proxy")
            .build()
            .unwrap();
        assert_eq!(proxy.route(), "/proxy");
    }
}
