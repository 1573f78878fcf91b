//! # manga_proxy
//!
//! A reading proxy that fetches a page on behalf of the client, strips
//! advertising, popups and tracking from it, and rewrites every link so that
//! browsing stays inside the proxy.
//!
//! ## Overview
//!
//! Each request for `/read?url=<target>` goes through the same gate:
//!
//! 1. targets matching the [`Blocklist`] get an empty `204`;
//! 2. a live [`PageCache`] entry is served without touching the network;
//! 3. otherwise the [`Fetcher`] retrieves the target. Non-HTML bodies are
//!    returned as-is; HTML runs through the [`SanitizerPipeline`] and the
//!    result is cached for five minutes.
//!
//! Any failure along the way yields one generic `500` response. The logs
//! record whether the fetch or the rewrite failed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use manga_proxy::{HttpFetcher, ProxyBuilder, server};
//!
//! # async fn example() -> manga_proxy::Result<()> {
//! let proxy = ProxyBuilder::new(HttpFetcher::new()?).build()?;
//! let app = server::router(Arc::new(proxy));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! server::serve(listener, app, async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `native-tls` | **yes** | Use the platform TLS stack for upstream requests. |
//! | `rustls-tls` | no | Use `rustls` for upstream requests. |

pub mod blocklist;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod proxy;
pub mod sanitizer;
pub mod server;

pub use blocklist::Blocklist;
pub use cache::{MemoryCache, NoopCache, PageCache};
pub use config::{LogFormat, ProxyBuilder, Settings};
pub use error::{ProxyError, Result, Stage};
pub use fetch::{Fetcher, HttpFetcher, Upstream};
pub use proxy::{FAILURE_MESSAGE, MangaProxy, ProxyResponse};
pub use sanitizer::{
    Document, LinkRewriter, Sanitizer, SanitizerPipeline, ScriptSanitizer, SelectorAction,
    SelectorSanitizer,
};
