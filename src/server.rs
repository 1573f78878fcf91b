//! Axum front end: the proxy route, response headers and the serve loop.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::cache::PageCache;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::proxy::{FAILURE_MESSAGE, MangaProxy, ProxyResponse};

/// Value of the `X-Proxy-By` header.
pub const PROXY_NAME: &str = "MangaProxy";

/// `Content-Security-Policy` sent with every response.
pub const CONTENT_SECURITY_POLICY: &str = "default-src * 'unsafe-inline' data: blob:;";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Blocked => StatusCode::NO_CONTENT.into_response(),
            Self::Page(html) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
                html,
            )
                .into_response(),
            Self::Passthrough { content_type, body } => {
                let content_type = HeaderValue::from_str(&content_type).unwrap_or_else(|_| {
                    HeaderValue::from_static(crate::proxy::FALLBACK_CONTENT_TYPE)
                });
                (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
            }
            Self::Failed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HTML_CONTENT_TYPE)],
                FAILURE_MESSAGE,
            )
                .into_response(),
        }
    }
}

/// Build the router: the proxy route plus the headers every response carries.
pub fn router<F: Fetcher, C: PageCache>(proxy: Arc<MangaProxy<F, C>>) -> Router {
    let route = proxy.route().to_string();

    Router::new()
        .route(&route, get(read::<F, C>))
        .with_state(proxy)
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-proxy-by"),
            HeaderValue::from_static(PROXY_NAME),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(TraceLayer::new_for_http())
}

async fn read<F: Fetcher, C: PageCache>(
    State(proxy): State<Arc<MangaProxy<F, C>>>,
    Query(params): Query<HashMap<String, String>>,
) -> ProxyResponse {
    proxy.handle(params.get("url").map(String::as_str)).await
}

/// Serve `app` on `listener` until `shutdown` resolves, then drain in-flight
/// requests.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}
