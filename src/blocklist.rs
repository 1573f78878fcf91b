//! Substring blocklist for advertising and tracking URLs.

use regex::Regex;

/// Substrings that mark a target url as an ad or tracker.
pub const DEFAULT_BLOCKED: &[&str] = &["ads.", "popup", "doubleclick", "tracking"];

/// Blocks target urls containing any of a fixed set of literal substrings.
///
/// Matching is case-sensitive and runs against the raw url string, not its
/// host, so `https://example.com/tracking-guide` is blocked just like
/// `https://ads.example.com/`.
///
/// # Example
///
/// ```
/// use manga_proxy::Blocklist;
///
/// let blocklist = Blocklist::standard().unwrap();
/// assert!(blocklist.is_blocked("https://ads.example.com/banner.js"));
/// assert!(!blocklist.is_blocked("https://example.com/chapter/1"));
/// ```
#[derive(Clone, Debug)]
pub struct Blocklist {
    pattern: Option<Regex>,
}

impl Blocklist {
    /// Build a blocklist from literal substrings.
    ///
    /// An empty list blocks nothing.
    pub fn new<I, S>(needles: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = needles
            .into_iter()
            .filter(|n| !n.as_ref().is_empty())
            .map(|n| regex::escape(n.as_ref()))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        Ok(Self {
            pattern: Some(Regex::new(&alternatives.join("|"))?),
        })
    }

    /// A blocklist of [`DEFAULT_BLOCKED`].
    pub fn standard() -> crate::Result<Self> {
        Self::new(DEFAULT_BLOCKED)
    }

    /// Returns `true` if the url contains any blocked substring.
    pub fn is_blocked(&self, url: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(url))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_ad_subdomains() {
        let blocklist = Blocklist::standard().unwrap();
        assert!(blocklist.is_blocked("https://ads.example.com/"));
        assert!(blocklist.is_blocked("https://static.doubleclick.net/x.js"));
        assert!(blocklist.is_blocked("https://example.com/popup?id=3"));
    }

    #[test]
    fn dot_is_literal() {
        let blocklist = Blocklist::standard().unwrap();
        // "ads" without the trailing dot does not match
        assert!(!blocklist.is_blocked("https://example.com/uploads/cover.jpg"));
        assert!(!blocklist.is_blocked("https://adsXexample.com/"));
    }

    #[test]
    fn matches_anywhere_in_url() {
        let blocklist = Blocklist::standard().unwrap();
        assert!(blocklist.is_blocked("https://example.com/blog/tracking-parcels"));
    }

    #[test]
    fn case_sensitive() {
        let blocklist = Blocklist::standard().unwrap();
        assert!(!blocklist.is_blocked("https://ADS.example.com/"));
        assert!(!blocklist.is_blocked("https://example.com/Tracking"));
    }

    #[test]
    fn custom_needles() {
        let blocklist = Blocklist::new(["evil.com", "a+b"]).unwrap();
        assert!(blocklist.is_blocked("https://evil.com/"));
        assert!(blocklist.is_blocked("https://x.org/?q=a+b"));
        assert!(!blocklist.is_blocked("https://x.org/?q=aab"));
        assert!(!blocklist.is_blocked("https://ads.example.com/"));
    }

    #[test]
    fn empty_blocks_nothing() {
        let blocklist = Blocklist::new(Vec::<String>::new()).unwrap();
        assert!(!blocklist.is_blocked("https://ads.example.com/"));
    }
}
