//! Anchor rewriting that keeps navigation inside the proxy.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use scraper::Selector;

use super::selector::parse_selector;
use super::{Document, Sanitizer};
use crate::error::{ProxyError, Result};

/// Characters escaped in a single query value: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Sanitizer that points every `<a href>` back at the proxy route.
///
/// Empty hrefs, in-page fragments (`#...`) and `mailto:` links are left
/// alone. Everything else is resolved against the page url and replaced by
/// `<route>?url=<encoded absolute url>`.
pub struct LinkRewriter {
    route: String,
    selector: Selector,
}

impl LinkRewriter {
    /// Create a rewriter targeting `route` (for example `/read`).
    pub fn new(route: impl Into<String>) -> Result<Self> {
        Ok(Self {
            route: route.into(),
            selector: parse_selector("a[href]")?,
        })
    }

    /// The proxy-relative form of an absolute url.
    pub fn proxied(&self, absolute: &str) -> String {
        proxied_url(&self.route, absolute)
    }
}

/// Build `<route>?url=<encoded>` for an absolute url.
pub fn proxied_url(route: &str, absolute: &str) -> String {
    format!("{route}?url={}", utf8_percent_encode(absolute, QUERY_VALUE))
}

/// Returns `true` for hrefs that must keep their original value.
fn is_exempt(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.starts_with("mailto:")
}

/// Resolve an href found on `doc` to an absolute url.
///
/// Protocol-relative hrefs are assumed to be `https`, root-relative hrefs
/// are joined to the page origin, anything not starting with `http` goes
/// through standard relative resolution, and the rest is used as-is.
pub fn resolve_href(doc: &Document, href: &str) -> Result<String> {
    if href.starts_with("//") {
        Ok(format!("https:{href}"))
    } else if href.starts_with('/') {
        Ok(format!("{}{href}", doc.origin()))
    } else if !href.starts_with("http") {
        doc.url()
            .join(href)
            .map(String::from)
            .map_err(|e| ProxyError::Transform(format!("cannot resolve `{href}`: {e}")))
    } else {
        Ok(href.to_string())
    }
}

impl Sanitizer for LinkRewriter {
    fn sanitize(&self, doc: &mut Document) -> Result<()> {
        let mut rewrites = Vec::new();
        for anchor in doc.select(&self.selector) {
            let Some(href) = doc.attr(&anchor, "href") else {
                continue;
            };
            if is_exempt(href) {
                continue;
            }
            let absolute = resolve_href(doc, href)?;
            rewrites.push((anchor.id(), self.proxied(&absolute)));
        }

        tracing::trace!("Rewriting {} links on {}", rewrites.len(), doc.url());
        for (id, href) in rewrites {
            doc.set_attr(id, "href", href);
        }
        Ok(())
    }
}
