//! Removal of inline scripts that open popups.

use scraper::Selector;

use super::selector::parse_selector;
use super::{Document, Sanitizer};
use crate::error::Result;

/// Inline script fragments that mark a script as a popup opener.
pub const DEFAULT_SCRIPT_NEEDLES: &[&str] = &["window.open", "target=_blank", "popup"];

/// Sanitizer that removes `<script>` elements whose inline text contains any
/// of a set of literal substrings.
///
/// External scripts (`<script src=...></script>`) have no inline text and are
/// never touched.
///
/// # Example
///
/// ```
/// use manga_proxy::{Document, Sanitizer, ScriptSanitizer};
///
/// let url = url::Url::parse("https://example.com/").unwrap();
/// let mut doc = Document::parse("<script>window.open('x')</script><p>ok</p>", url);
/// ScriptSanitizer::standard().unwrap().sanitize(&mut doc).unwrap();
/// assert!(!doc.serialize().contains("window.open"));
/// ```
pub struct ScriptSanitizer {
    needles: Vec<String>,
    selector: Selector,
}

impl ScriptSanitizer {
    /// Create a new `ScriptSanitizer` matching any of `needles`.
    pub fn new<I, S>(needles: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            needles: needles
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
            selector: parse_selector("script")?,
        })
    }

    /// A sanitizer matching [`DEFAULT_SCRIPT_NEEDLES`].
    pub fn standard() -> Result<Self> {
        Self::new(DEFAULT_SCRIPT_NEEDLES.iter().copied())
    }
}

impl Sanitizer for ScriptSanitizer {
    fn sanitize(&self, doc: &mut Document) -> Result<()> {
        let doomed: Vec<_> = doc
            .select(&self.selector)
            .filter(|script| {
                let body: String = script.text().collect();
                self.needles.iter().any(|n| body.contains(n.as_str()))
            })
            .map(|script| script.id())
            .collect();

        if !doomed.is_empty() {
            tracing::debug!("Removing {} popup scripts", doomed.len());
        }
        for id in doomed {
            doc.remove(id);
        }
        Ok(())
    }
}
