//! Navigation guard for the headless browser.
//!
//! The browser resolves names itself, so only literal IP hosts and
//! well-known local names can be refused up front.

use std::net::IpAddr;
use url::{Host, Url};

/// Why a URL may not be navigated to.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("blocked scheme: {0}")]
    BlockedScheme(String),

    #[error("blocked host: {0} (private/reserved)")]
    BlockedHost(String),

    #[error("URL has no host")]
    MissingHost,
}

/// Check that `url` is a public http(s) address.
pub fn check_navigable(url: &Url) -> Result<(), GuardError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(GuardError::BlockedScheme(other.to_string())),
    }

    match url.host() {
        None => Err(GuardError::MissingHost),
        Some(Host::Ipv4(v4)) if is_private_or_reserved(IpAddr::V4(v4)) => Err(GuardError::BlockedHost(v4.to_string())),
        Some(Host::Ipv6(v6)) if is_private_or_reserved(IpAddr::V6(v6)) => Err(GuardError::BlockedHost(v6.to_string())),
        Some(Host::Domain(name)) if is_local_name(name) => Err(GuardError::BlockedHost(name.to_string())),
        Some(_) => Ok(()),
    }
}

fn is_local_name(name: &str) -> bool {
    let name = name.trim_end_matches('.');
    name == "localhost" || name.ends_with(".localhost") || name.ends_with(".local") || name.ends_with(".internal")
}

/// Loopback, RFC 1918, link-local, multicast, broadcast, unspecified,
/// `0.0.0.0/8`, IPv6 unique-local, and IPv4-mapped forms of the above.
pub fn is_private_or_reserved(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_multicast()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(s: &str) -> Result<(), GuardError> {
        check_navigable(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_public_urls_allowed() {
        assert!(check("https://example.com/page").is_ok());
        assert!(check("http://93.184.216.34/").is_ok());
        assert!(check("https://[2606:4700::1111]/").is_ok());
    }

    #[test]
    fn test_schemes_blocked() {
        for url in ["file:///etc/passwd", "ftp://example.com/", "data:text/html,hi", "chrome://settings"] {
            assert!(matches!(check(url), Err(GuardError::BlockedScheme(_))), "{url}");
        }
    }

    #[test]
    fn test_private_ip_literals_blocked() {
        for url in [
            "http://127.0.0.1:8080/",
            "http://10.1.2.3/",
            "http://172.16.0.1/",
            "http://192.168.1.1/admin",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/",
            "http://100.64.0.1/",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://[fe80::1]/",
            "http://[::ffff:10.0.0.1]/",
        ] {
            assert!(matches!(check(url), Err(GuardError::BlockedHost(_))), "{url}");
        }
    }

    #[test]
    fn test_local_names_blocked() {
        assert!(check("http://localhost:3000/").is_err());
        assert!(check("http://api.localhost/").is_err());
        assert!(check("http://printer.local/").is_err());
        assert!(check("https://localhost.example.com/").is_ok());
    }

    #[test]
    fn test_cgnat_boundary() {
        use std::net::Ipv4Addr;
        assert!(is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(100, 127, 255, 255))));
        assert!(!is_private_or_reserved(IpAddr::V4(Ipv4Addr::new(100, 128, 0, 1))));
    }
}
