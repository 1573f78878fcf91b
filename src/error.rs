//! Error types for the `manga_proxy` crate.

use std::fmt;

/// All errors that can occur while serving a proxied page.
///
/// Every variant collapses into the same generic failure response at the
/// HTTP boundary; the distinction only matters for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The request carried no `url` query parameter.
    #[error("Missing target url")]
    MissingTarget,

    /// The target url is not a valid absolute URL.
    #[error("Invalid target url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The upstream request failed or its body could not be read.
    #[error("Upstream fetch failed: {0}")]
    Fetch(Box<dyn std::error::Error + Send + Sync>),

    /// A rewrite step failed on the fetched document.
    #[error("Rewrite failed: {0}")]
    Transform(String),

    /// A CSS selector handed to a sanitizer could not be parsed.
    #[error("Invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// A blocklist pattern could not be compiled.
    #[error("Invalid blocklist pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The builder or environment configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// Binding or running the listener failed.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The pipeline stage an error originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Network access to the upstream.
    Fetch,
    /// Parsing, rewriting or serializing the fetched page.
    Transform,
    /// Building the proxy itself.
    Setup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Transform => "transform",
            Self::Setup => "setup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProxyError {
    /// Classify the error so operators can tell network problems from
    /// malformed input.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Fetch(_) => Stage::Fetch,
            Self::MissingTarget | Self::InvalidUrl(_) | Self::Transform(_) => Stage::Transform,
            Self::Selector { .. } | Self::Pattern(_) | Self::Config(_) | Self::Io(_) => {
                Stage::Setup
            }
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Fetch(Box::new(e))
    }
}

/// A type alias for `Result<T, ProxyError>`.
pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_report_fetch_stage() {
        let err = ProxyError::Fetch("connection refused".into());
        assert_eq!(err.stage(), Stage::Fetch);
        assert_eq!(err.to_string(), "Upstream fetch failed: connection refused");
    }

    #[test]
    fn malformed_target_is_a_transform_failure() {
        let err: ProxyError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.stage(), Stage::Transform);
        assert_eq!(ProxyError::MissingTarget.stage(), Stage::Transform);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Fetch.to_string(), "fetch");
        assert_eq!(Stage::Transform.to_string(), "transform");
        assert_eq!(Stage::Setup.to_string(), "setup");
    }
}
