//! HTML rewrite pipeline that strips ads and re-routes links.
//!
//! Sanitizers implement the [`Sanitizer`] trait and are composed into a
//! [`SanitizerPipeline`] that runs them sequentially over one mutable
//! [`Document`].
//!
//! Built-in sanitizers:
//!
//! - [`ScriptSanitizer`] -- drops inline popup scripts.
//! - [`SelectorSanitizer`] -- CSS-selector-based element and attribute removal.
//! - [`LinkRewriter`] -- points anchors back at the proxy route.

mod document;
mod links;
mod script;
mod selector;

pub use document::Document;
pub use links::{LinkRewriter, proxied_url, resolve_href};
pub use script::{DEFAULT_SCRIPT_NEEDLES, ScriptSanitizer};
pub use selector::{DEFAULT_AD_SELECTOR, SelectorAction, SelectorSanitizer};

use url::Url;

use crate::error::Result;

/// Trait for document rewrite steps.
///
/// Each sanitizer edits the document in place and may fail; a failure aborts
/// the whole rewrite. Implementations must be `Send + Sync` so they can be
/// shared between request handlers.
pub trait Sanitizer: Send + Sync {
    /// Apply this step to the document.
    fn sanitize(&self, doc: &mut Document) -> Result<()>;
}

/// An ordered chain of [`Sanitizer`] implementations applied sequentially.
///
/// Each sanitizer sees the document as left by the previous one. An empty
/// pipeline only re-serializes the page.
pub struct SanitizerPipeline {
    sanitizers: Vec<Box<dyn Sanitizer>>,
}

impl SanitizerPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            sanitizers: Vec::new(),
        }
    }

    /// The standard reader pipeline: popup scripts, ad elements, `onclick`
    /// and `target="_blank"` attributes, then link rewriting to `route`.
    pub fn standard(route: &str) -> Result<Self> {
        let mut pipeline = Self::new();
        pipeline.add(ScriptSanitizer::standard()?);
        pipeline.add(SelectorSanitizer::ad_rules(DEFAULT_AD_SELECTOR)?);
        pipeline.add(LinkRewriter::new(route)?);
        Ok(pipeline)
    }

    /// Append a sanitizer to the end of the pipeline.
    pub fn add(&mut self, sanitizer: impl Sanitizer + 'static) {
        self.sanitizers.push(Box::new(sanitizer));
    }

    /// Append an already boxed sanitizer.
    pub fn push_boxed(&mut self, sanitizer: Box<dyn Sanitizer>) {
        self.sanitizers.push(sanitizer);
    }

    /// Run every step against `doc`, stopping at the first failure.
    pub fn run(&self, doc: &mut Document) -> Result<()> {
        self.sanitizers.iter().try_for_each(|s| s.sanitize(doc))
    }

    /// Parse `html` fetched from `url`, run the pipeline and serialize the
    /// result.
    pub fn rewrite(&self, html: &str, url: &Url) -> Result<String> {
        let mut doc = Document::parse(html, url.clone());
        self.run(&mut doc)?;
        Ok(doc.serialize())
    }

    /// Returns `true` if no sanitizers have been added.
    pub fn is_empty(&self) -> bool {
        self.sanitizers.is_empty()
    }
}

impl Default for SanitizerPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProxyError;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn pipeline_empty_is_empty() {
        assert!(SanitizerPipeline::new().is_empty());
        assert!(SanitizerPipeline::default().is_empty());
    }

    #[test]
    fn pipeline_not_empty_after_add() {
        let mut pipeline = SanitizerPipeline::new();
        pipeline.add(ScriptSanitizer::standard().unwrap());
        assert!(!pipeline.is_empty());
    }

    #[test]
    fn pipeline_with_no_sanitizers_reserializes() {
        let pipeline = SanitizerPipeline::new();
        let out = pipeline
            .rewrite("<p>original</p>", &url("https://example.com/"))
            .unwrap();
        assert_eq!(
            out,
            "<html><head></head><body><p>original</p></body></html>"
        );
    }

    #[test]
    fn standard_pipeline_cleans_reader_page() {
        let pipeline = SanitizerPipeline::standard("/read").unwrap();
        let html = concat!(
            r#"<!DOCTYPE html><html><head>"#,
            r#"<script src="reader.js"></script>"#,
            r#"<script>setTimeout(function(){ window.open('https://ads.example') }, 10)</script>"#,
            r#"</head><body>"#,
            r#"<div class="banner"><a href="/promo">promo</a></div>"#,
            r#"<div class="ads-slot">slot</div>"#,
            r#"<img src="/pages/1.jpg" onclick="next()">"#,
            r#"<a href="/manga/ch2" target="_blank" onclick="pop()">Next chapter</a>"#,
            r##"<a href="#top">Top</a>"##,
            r#"</body></html>"#,
        );
        let out = pipeline
            .rewrite(html, &url("https://reader.example.com/manga/ch1"))
            .unwrap();

        assert!(out.contains(r#"<script src="reader.js"></script>"#));
        assert!(!out.contains("window.open"));
        assert!(!out.contains("promo"));
        assert!(!out.contains("ads-slot"));
        assert!(out.contains(r#"<img src="/pages/1.jpg">"#));
        assert!(out.contains(concat!(
            r#"<a href="/read?url=https%3A%2F%2Freader.example.com%2Fmanga%2Fch2">"#,
            "Next chapter</a>"
        )));
        assert!(out.contains(r##"<a href="#top">Top</a>"##));
    }

    #[test]
    fn failing_step_aborts_rewrite() {
        struct Broken;
        impl Sanitizer for Broken {
            fn sanitize(&self, _doc: &mut Document) -> Result<()> {
                Err(ProxyError::Transform("boom".into()))
            }
        }

        let mut pipeline = SanitizerPipeline::new();
        pipeline.add(Broken);
        let result = pipeline.rewrite("<p>x</p>", &url("https://example.com/"));
        assert!(matches!(result, Err(ProxyError::Transform(_))));
    }

    #[test]
    fn unresolvable_href_fails_rewrite() {
        let pipeline = SanitizerPipeline::standard("/read").unwrap();
        // a non-hierarchical base cannot resolve relative paths
        let result = pipeline.rewrite(
            r#"<a href="chapter-2">next</a>"#,
            &url("data:text/html,hello"),
        );
        assert!(matches!(result, Err(ProxyError::Transform(_))));
    }
}
