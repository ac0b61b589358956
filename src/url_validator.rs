//! URL validation for rendered links and backend configuration.
//!
//! Reference URLs arrive from the backend (or are scraped out of freeform
//! citation text) and end up in `href` attributes, so they are gated to
//! web schemes before rendering — a `javascript:` or `data:` URL must never
//! reach the page. The configured backend base URL gets the same check at
//! startup so a typo fails fast instead of on the first chat request.

use url::Url;

/// Result of URL validation
#[derive(Debug, Clone)]
pub enum UrlValidationError {
    /// URL is malformed or cannot be parsed
    InvalidUrl(String),
    /// URL uses a scheme other than http/https
    UnsupportedScheme(String),
    /// URL has no host component
    MissingHost,
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlValidationError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            UrlValidationError::UnsupportedScheme(scheme) => {
                write!(f, "Unsupported URL scheme: {}", scheme)
            }
            UrlValidationError::MissingHost => write!(f, "URL has no host"),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// Validate a URL destined for an `href` attribute: well-formed, http or
/// https, and carrying a host.
pub fn validate_link(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str).map_err(|e| UrlValidationError::InvalidUrl(e.to_string()))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(UrlValidationError::UnsupportedScheme(
            url.scheme().to_string(),
        ));
    }

    if url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// The href to actually render for a reference URL: the URL itself when it
/// passes validation, otherwise nothing (the renderer falls back to plain
/// text). The "no link" sentinel `#` is never a link.
pub fn safe_href(url_str: &str) -> Option<String> {
    if url_str.is_empty() || url_str == "#" {
        return None;
    }
    validate_link(url_str).ok().map(|u| u.to_string())
}

/// Validate the configured backend base URL at startup. Localhost and
/// private addresses are fine here — the backend usually is local.
pub fn validate_backend_url(url_str: &str) -> Result<Url, UrlValidationError> {
    validate_link(url_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_web_urls() {
        assert!(validate_link("https://pubmed.ncbi.nlm.nih.gov/12345/").is_ok());
        assert!(validate_link("http://localhost:8000").is_ok());
    }

    #[test]
    fn test_rejects_script_schemes() {
        assert!(matches!(
            validate_link("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_link("data:text/html,<script>"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(
            validate_link("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_safe_href_sentinel_is_not_a_link() {
        assert!(safe_href("#").is_none());
        assert!(safe_href("").is_none());
        assert_eq!(
            safe_href("https://fda.gov/label").as_deref(),
            Some("https://fda.gov/label")
        );
    }
}
