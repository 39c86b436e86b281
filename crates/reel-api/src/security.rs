//! Security utilities.
//!
//! This module provides:
//! - The result origin allowlist used by the result gateway
//! - Source URL validation (SSRF protection for changelog fetching)
//! - Job ID format checks

use tracing::warn;
use url::Url;

use reel_models::net::is_internal_host;
use reel_models::MAX_SOURCE_URL_LENGTH;

/// One trusted result origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigin {
    scheme: String,
    host: String,
}

impl AllowedOrigin {
    /// Parse an entry such as `https://storage.googleapis.com`.
    pub fn parse(entry: &str) -> Option<Self> {
        let url = Url::parse(entry.trim()).ok()?;
        let host = url.host_str()?.trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return None;
        }
        Some(Self {
            scheme: url.scheme().to_string(),
            host,
        })
    }

    /// Same scheme, and the host is this entry's host or a subdomain of it.
    fn matches(&self, scheme: &str, host: &str) -> bool {
        if scheme != self.scheme {
            return false;
        }
        host == self.host
            || host
                .strip_suffix(self.host.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// Origins the result gateway may fetch artifacts from.
///
/// Matching is structural on the parsed URL. Paths, query strings and
/// look-alike hosts never satisfy an entry.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowlist {
    entries: Vec<AllowedOrigin>,
}

impl OriginAllowlist {
    /// Build from configured entries. Unparseable entries are skipped.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        let entries = entries
            .iter()
            .filter_map(|entry| {
                let parsed = AllowedOrigin::parse(entry.as_ref());
                if parsed.is_none() {
                    warn!(entry = %entry.as_ref(), "Ignoring invalid result origin");
                }
                parsed
            })
            .collect();
        Self { entries }
    }

    pub fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.entries
            .iter()
            .any(|entry| entry.matches(url.scheme(), &host))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of source URL validation.
#[derive(Debug)]
pub enum UrlValidationResult {
    /// URL is valid and allowed.
    Valid(String),
    /// URL is malformed or uses an unsupported protocol.
    Invalid(String),
    /// URL targets an internal or restricted endpoint.
    Blocked(String),
    /// URL exceeds maximum length.
    TooLong,
}

impl UrlValidationResult {
    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) => Err(msg),
            Self::Blocked(reason) => Err(reason),
            Self::TooLong => Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_SOURCE_URL_LENGTH
            )),
        }
    }
}

/// Validate a changelog source URL before the server fetches it.
///
/// Checks the literal host only. Names that resolve to internal addresses
/// and redirects are refused by the changelog fetcher itself.
pub fn validate_source_url(url: &str) -> UrlValidationResult {
    if url.len() > MAX_SOURCE_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    let blocked = match parsed.host() {
        None => return UrlValidationResult::Invalid("URL must have a valid host".to_string()),
        Some(host) => is_internal_host(&host),
    };

    if blocked {
        warn!(url = %url, "Blocked source URL targeting internal endpoint");
        return UrlValidationResult::Blocked(
            "URL appears to target an internal or restricted endpoint".to_string(),
        );
    }

    UrlValidationResult::Valid(url.to_string())
}

/// Validate job ID format.
///
/// Valid format: alphanumeric characters and hyphens only, 8-64 chars.
pub fn is_valid_job_id(id: &str) -> bool {
    if id.len() > 64 || id.len() < 8 {
        return false;
    }
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> OriginAllowlist {
        OriginAllowlist::from_entries(&[
            "https://generativelanguage.googleapis.com",
            "https://storage.googleapis.com",
        ])
    }

    fn allowed(url: &str) -> bool {
        allowlist().is_allowed(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_allowlist_accepts_exact_and_subdomain_hosts() {
        assert!(allowed("https://storage.googleapis.com/bucket/video.mp4"));
        assert!(allowed("https://sub.storage.googleapis.com/x"));
        assert!(allowed(
            "https://generativelanguage.googleapis.com/v1beta/files/abc:download?alt=media"
        ));
        assert!(allowed("https://STORAGE.googleapis.com/x"));
    }

    #[test]
    fn test_allowlist_rejects_lookalikes() {
        assert!(!allowed("https://evil.com/storage.googleapis.com/x"));
        assert!(!allowed("https://evil-storage.googleapis.com.attacker.com/x"));
        assert!(!allowed("https://evilstorage.googleapis.com/x"));
        assert!(!allowed("https://googleapis.com/x"));
        assert!(!allowed("https://evil.com/?next=https://storage.googleapis.com"));
        assert!(!allowed("https://storage.googleapis.com@evil.com/x"));
    }

    #[test]
    fn test_allowlist_requires_matching_scheme() {
        assert!(!allowed("http://storage.googleapis.com/x"));
    }

    #[test]
    fn test_allowlist_skips_invalid_entries() {
        let list = OriginAllowlist::from_entries(&["not a url", "https://cdn.example.com"]);
        assert_eq!(list.len(), 1);
        assert!(list.is_allowed(&Url::parse("https://cdn.example.com/a.mp4").unwrap()));
    }

    #[test]
    fn test_allowlist_port_is_ignored() {
        let list = OriginAllowlist::from_entries(&["http://127.0.0.1"]);
        assert!(list.is_allowed(&Url::parse("http://127.0.0.1:4010/v.mp4").unwrap()));
    }

    #[test]
    fn test_valid_source_urls() {
        assert!(matches!(
            validate_source_url("https://github.com/acme/widget/blob/main/CHANGELOG.md"),
            UrlValidationResult::Valid(_)
        ));
        assert!(matches!(
            validate_source_url("http://example.com/CHANGES.md"),
            UrlValidationResult::Valid(_)
        ));
    }

    #[test]
    fn test_blocked_internal_sources() {
        for url in [
            "http://127.0.0.1/CHANGELOG.md",
            "http://localhost/CHANGELOG.md",
            "http://api.localhost/CHANGELOG.md",
            "http://10.0.0.5/CHANGELOG.md",
            "http://172.16.0.1/CHANGELOG.md",
            "http://192.168.1.1/CHANGELOG.md",
            "http://169.254.169.254/latest/meta-data/",
            "http://metadata.google.internal/computeMetadata/v1/",
            "http://[::1]/CHANGELOG.md",
            "http://[fd00::1]/CHANGELOG.md",
            "http://[::ffff:127.0.0.1]/CHANGELOG.md",
            "http://0.0.0.0/CHANGELOG.md",
        ] {
            assert!(
                matches!(validate_source_url(url), UrlValidationResult::Blocked(_)),
                "{} should be blocked",
                url
            );
        }
    }

    #[test]
    fn test_invalid_source_urls() {
        assert!(matches!(
            validate_source_url("ftp://example.com/CHANGELOG.md"),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_source_url("not a url"),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_source_url(&format!("https://example.com/{}", "a".repeat(2048))),
            UrlValidationResult::TooLong
        ));
    }

    #[test]
    fn test_job_id_validation() {
        assert!(is_valid_job_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_job_id("short"));
        assert!(!is_valid_job_id("has/slash-in-it"));
        assert!(!is_valid_job_id("../../etc/passwd"));
    }
}
