//! Internal network address checks.
//!
//! Shared by source URL validation at job creation and by the changelog
//! fetcher, which re-applies them to resolved addresses and redirect hops.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::Host;

/// Hostnames that always resolve to the local machine or cloud metadata.
const BLOCKED_HOSTNAMES: &[&str] = &["localhost", "metadata", "metadata.google.internal"];

/// Loopback, private, link-local, shared and unspecified addresses.
pub fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_ipv4(v4),
        IpAddr::V6(v6) => is_internal_ipv6(v6),
    }
}

fn is_internal_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 0.0.0.0/8 "this network"
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_internal_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_internal_ipv4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

/// Names reserved for the local machine, internal zones or metadata services.
pub fn is_internal_hostname(name: &str) -> bool {
    let name = name.trim_end_matches('.').to_ascii_lowercase();
    BLOCKED_HOSTNAMES.contains(&name.as_str())
        || name.ends_with(".localhost")
        || name.ends_with(".internal")
}

/// Check a parsed URL host without resolving it.
pub fn is_internal_host(host: &Host<&str>) -> bool {
    match host {
        Host::Ipv4(ip) => is_internal_ipv4(*ip),
        Host::Ipv6(ip) => is_internal_ipv6(*ip),
        Host::Domain(name) => is_internal_hostname(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_internal_ipv4() {
        for addr in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.1",
            "192.168.1.1",
            "169.254.169.254",
            "0.0.0.0",
            "0.1.2.3",
            "100.64.0.1",
            "255.255.255.255",
        ] {
            assert!(is_internal_ip(ip(addr)), "{} should be internal", addr);
        }
        for addr in ["8.8.8.8", "142.250.72.14", "100.128.0.1"] {
            assert!(!is_internal_ip(ip(addr)), "{} should be public", addr);
        }
    }

    #[test]
    fn test_internal_ipv6() {
        for addr in ["::1", "::", "fd00::1", "fe80::1", "::ffff:127.0.0.1", "::ffff:10.0.0.1"] {
            assert!(is_internal_ip(ip(addr)), "{} should be internal", addr);
        }
        assert!(!is_internal_ip(ip("2607:f8b0:4004:800::200e")));
    }

    #[test]
    fn test_internal_hostnames() {
        assert!(is_internal_hostname("localhost"));
        assert!(is_internal_hostname("LOCALHOST."));
        assert!(is_internal_hostname("api.localhost"));
        assert!(is_internal_hostname("metadata.google.internal"));
        assert!(is_internal_hostname("db.corp.internal"));
        assert!(!is_internal_hostname("github.com"));
        assert!(!is_internal_hostname("internal.example.com"));
    }
}
