//! Upstream names used to key circuit breakers.

use url::{Host, Url};

/// Host labels that say nothing about which service is behind them.
const GENERIC_PREFIXES: &[&str] = &["api", "www", "www2"];

/// Name used when the URL has no host.
pub const UNKNOWN_UPSTREAM: &str = "unknown";

/// Derive a logical upstream name from a URL host.
///
/// `api.fred.stlouisfed.org` → `fred`, `clinicaltrials.gov` → `clinicaltrials`.
/// IP hosts are used whole.
pub fn derive_upstream(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.host()? {
        Host::Domain(domain) => {
            let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
            let first = *labels.first()?;
            let name = match labels.get(1) {
                Some(&second) if GENERIC_PREFIXES.contains(&first.to_ascii_lowercase().as_str()) => {
                    second
                },
                _ => first,
            };
            Some(name.to_ascii_lowercase())
        },
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// Explicit name if given, else derived from `url`.
pub fn resolve_upstream(explicit: Option<&str>, url: &str) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| derive_upstream(url))
        .unwrap_or_else(|| UNKNOWN_UPSTREAM.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_generic_prefixes() {
        assert_eq!(derive_upstream("https://api.stlouisfed.org/fred/series").as_deref(), Some("stlouisfed"));
        assert_eq!(derive_upstream("https://www.sec.gov/cgi-bin/browse-edgar").as_deref(), Some("sec"));
        assert_eq!(derive_upstream("https://www2.example.com/").as_deref(), Some("example"));
    }

    #[test]
    fn test_uses_first_label_otherwise() {
        assert_eq!(derive_upstream("https://clinicaltrials.gov/api/v2/studies").as_deref(), Some("clinicaltrials"));
        assert_eq!(derive_upstream("https://efts.sec.gov/LATEST/search-index").as_deref(), Some("efts"));
        assert_eq!(derive_upstream("http://localhost:8080/x").as_deref(), Some("localhost"));
    }

    #[test]
    fn test_single_generic_label_is_kept() {
        assert_eq!(derive_upstream("http://api/health").as_deref(), Some("api"));
    }

    #[test]
    fn test_ip_hosts_are_used_whole() {
        assert_eq!(derive_upstream("http://127.0.0.1:9000/x").as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_unparseable_url() {
        assert_eq!(derive_upstream("not a url"), None);
        assert_eq!(resolve_upstream(None, "not a url"), UNKNOWN_UPSTREAM);
    }

    #[test]
    fn test_explicit_name_wins() {
        assert_eq!(resolve_upstream(Some("edgar"), "https://www.sec.gov/"), "edgar");
    }
}
