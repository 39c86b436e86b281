//! Changelog fetching and version-section extraction.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use reel_models::net::{is_internal_host, is_internal_hostname, is_internal_ip};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{error_chain, read_capped};
use crate::traits::SourceFetcher;

/// Refuse changelogs larger than this.
const MAX_SOURCE_BYTES: usize = 5 * 1024 * 1024;

const MAX_REDIRECTS: usize = 5;

/// Cap on the section handed to the language model.
const MAX_SECTION_CHARS: usize = 12_000;

/// Markdown heading that opens a release, e.g. `## [1.4.0] - 2024-05-01`,
/// `# v2.0.0` or `### Version 3.1`.
static VERSION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^#{1,3}[ \t]*\[?(?:version[ \t]+)?v?\d+(?:\.\d+)+")
        .expect("version header pattern is valid")
});

/// Return the first release section of a changelog.
///
/// The section runs from the first version heading down to, but not
/// including, the next one. Text without any version heading is returned
/// whole. The result is trimmed and capped at [`MAX_SECTION_CHARS`].
pub fn extract_relevant_section(text: &str) -> String {
    let mut headers = VERSION_HEADER.find_iter(text);

    let section = match headers.next() {
        Some(first) => {
            let end = headers.next().map(|m| m.start()).unwrap_or(text.len());
            &text[first.start()..end]
        }
        None => text,
    };

    section.trim().chars().take(MAX_SECTION_CHARS).collect()
}

/// Rewrite GitHub `blob` page URLs to their raw content URL.
///
/// `https://github.com/o/r/blob/main/CHANGELOG.md` becomes
/// `https://raw.githubusercontent.com/o/r/main/CHANGELOG.md`. Anything else
/// is returned unchanged.
pub fn normalize_source_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };

    if !matches!(parsed.host_str(), Some("github.com") | Some("www.github.com")) {
        return url.to_string();
    }

    let segments: Vec<&str> = match parsed.path_segments() {
        Some(s) => s.filter(|s| !s.is_empty()).collect(),
        None => return url.to_string(),
    };

    match segments.as_slice() {
        [owner, repo, "blob", rest @ ..] if rest.len() >= 2 => format!(
            "https://raw.githubusercontent.com/{}/{}/{}",
            owner,
            repo,
            rest.join("/")
        ),
        _ => url.to_string(),
    }
}

/// Resolver that refuses names pointing at internal addresses.
///
/// Every connection the fetcher makes to a hostname goes through this, so a
/// public-looking name cannot reach loopback or private networks.
struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name.as_str().to_string()))
    }
}

async fn resolve_public(host: String) -> Result<Addrs, Box<dyn StdError + Send + Sync>> {
    if is_internal_hostname(&host) {
        return Err(format!("{} is an internal host", host).into());
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
    if let Some(internal) = addrs.iter().find(|addr| is_internal_ip(addr.ip())) {
        warn!(host = %host, ip = %internal.ip(), "Refusing changelog host with internal address");
        return Err(format!("{} resolves to internal address {}", host, internal.ip()).into());
    }

    Ok(Box::new(addrs.into_iter()))
}

/// Follow redirects only to public http(s) targets.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
        }
        match check_redirect_target(attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(reason) => {
                warn!(url = %attempt.url(), reason = %reason, "Refusing changelog redirect");
                attempt.error(reason)
            }
        }
    })
}

fn check_redirect_target(url: &Url) -> Result<(), String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("redirect to unsupported scheme '{}'", url.scheme()));
    }
    match url.host() {
        None => Err("redirect without a host".to_string()),
        Some(host) if is_internal_host(&host) => {
            Err(format!("redirect to internal host {}", host))
        }
        Some(_) => Ok(()),
    }
}

/// Plain HTTP changelog fetcher.
///
/// Hostnames are resolved through `PublicResolver` and every redirect hop
/// is checked, so neither can lead the fetch to an internal endpoint.
pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("changereel/", env!("CARGO_PKG_VERSION")))
            .dns_resolver(Arc::new(PublicResolver))
            .redirect(redirect_policy())
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch_source(&self, url: &str) -> ProviderResult<String> {
        let target = normalize_source_url(url);
        if target != url {
            debug!(original = %url, raw = %target, "Rewrote GitHub blob URL");
        }

        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(|e| {
                ProviderError::fetch(format!("{}: {}", target, error_chain(&e.without_url())))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::fetch(format!(
                "{} returned HTTP {}",
                target,
                status.as_u16()
            )));
        }

        let bytes = read_capped(response, MAX_SOURCE_BYTES)
            .await
            .map_err(|e| ProviderError::fetch(format!("{}: {}", target, error_chain(&e))))?;

        info!(url = %target, bytes = bytes.len(), "Fetched changelog");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
