//! Domain extraction from browser URLs.

use url::Url;

use crate::types::Domain;

/// Internal bookkeeping key that never represents a real site.
pub const BOOKKEEPING_DOMAIN: &str = "_idle";

/// Browser-internal pages that are tracked but never reported.
const IGNORED_DOMAINS: &[&str] = &[
    "newtab",
    "extensions",
    "settings",
    "history",
    "bookmarks",
    "downloads",
    "chrome",
    "about",
    "blank",
    "devtools",
    "chrome-extension",
];

const IGNORED_PREFIXES: &[&str] = &["chrome", "about", "edge", "brave"];

const WWW_PREFIX: &str = "www.";

/// Extracts the attribution domain from a URL.
///
/// The host is taken as the URL parser reports it (ports excluded) and a
/// single leading `www.` label is removed. Returns `None` for malformed URLs
/// and for URLs without a host such as `about:blank` or `data:` URLs.
pub fn domain_from_url(raw: &str) -> Option<Domain> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix(WWW_PREFIX).unwrap_or(host);
    Domain::new(host).ok()
}

/// Returns true for browser-internal domains excluded from analytics.
pub fn should_ignore(domain: &str) -> bool {
    if domain.is_empty() {
        return true;
    }
    IGNORED_DOMAINS
        .iter()
        .any(|ignored| domain == *ignored || domain.contains(ignored))
        || IGNORED_PREFIXES
            .iter()
            .any(|prefix| domain.starts_with(prefix))
}

/// Returns true for keys that must not appear in reports.
pub fn is_reportable(domain: &str) -> bool {
    domain != BOOKKEEPING_DOMAIN && !should_ignore(domain)
}
