//! CSS-selector-based element and attribute stripping.

use scraper::Selector;

use super::{Document, Sanitizer};
use crate::error::{ProxyError, Result};

/// Elements treated as advertising and dropped from every page.
pub const DEFAULT_AD_SELECTOR: &str =
    ".ads, .popup, .sponsored, .banner, [id*='ads'], [class*='ads']";

/// Action to perform on HTML elements matching a CSS selector.
#[derive(Clone, Debug)]
pub enum SelectorAction {
    /// Remove the specified attribute from matching elements.
    RemoveAttr(String),
    /// Remove the entire matching element (and its children) from the document.
    RemoveElement,
}

/// Sanitizer that uses CSS selectors to locate and modify HTML elements.
///
/// Each rule is a `(css_selector, action)` pair. Rules are applied in order
/// against the same document, so a later rule never sees an element an
/// earlier rule removed.
///
/// # Example
///
/// ```
/// use manga_proxy::{Document, Sanitizer, SelectorAction, SelectorSanitizer};
///
/// let sanitizer = SelectorSanitizer::new(vec![
///     (".sponsored", SelectorAction::RemoveElement),
///     ("[onclick]", SelectorAction::RemoveAttr("onclick".into())),
/// ])
/// .unwrap();
///
/// let url = url::Url::parse("https://example.com/").unwrap();
/// let mut doc = Document::parse(
///     r#"<div class="sponsored">buy</div><p onclick="go()">read</p>"#,
///     url,
/// );
/// sanitizer.sanitize(&mut doc).unwrap();
/// let out = doc.serialize();
/// assert!(!out.contains("buy"));
/// assert!(out.contains("<p>read</p>"));
/// ```
pub struct SelectorSanitizer {
    rules: Vec<(Selector, SelectorAction)>,
}

impl SelectorSanitizer {
    /// Create a new `SelectorSanitizer` from `(css_selector, action)` pairs.
    ///
    /// Returns [`ProxyError::Selector`] if any selector fails to parse.
    pub fn new(rules: Vec<(&str, SelectorAction)>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|(sel, action)| Ok((parse_selector(sel)?, action)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// The ad-stripping rules: drop ad containers, then strip `onclick`
    /// handlers and `target="_blank"` attributes.
    pub fn ad_rules(ad_selector: &str) -> Result<Self> {
        Self::new(vec![
            (ad_selector, SelectorAction::RemoveElement),
            ("[onclick]", SelectorAction::RemoveAttr("onclick".into())),
            (
                r#"[target="_blank"]"#,
                SelectorAction::RemoveAttr("target".into()),
            ),
        ])
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ProxyError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl Sanitizer for SelectorSanitizer {
    fn sanitize(&self, doc: &mut Document) -> Result<()> {
        for (selector, action) in &self.rules {
            let matched: Vec<_> = doc.select(selector).map(|el| el.id()).collect();

            for id in matched {
                match action {
                    SelectorAction::RemoveElement => doc.remove(id),
                    SelectorAction::RemoveAttr(attr) => doc.remove_attr(id, attr),
                }
            }
        }
        Ok(())
    }
}
