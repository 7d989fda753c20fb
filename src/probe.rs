//! HTTPS-first web fingerprinting.
//!
//! Makes at most two requests per target: HTTPS first, then plain HTTP only if
//! the HTTPS attempt failed at the transport level (refused, TLS failure,
//! timeout). An HTTPS response with an error status is still a response and
//! does not trigger the fallback.
//!
//! Certificate validation is disabled on purpose. Lab and internal targets
//! routinely present self-signed or mismatched certificates, and the point of
//! the probe is to read their headers, not to trust them.

use crate::classifier::DETECTION_FAILED;
use crate::error::ProbeError;
use crate::types::Port;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, SERVER};
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::{debug, info};

/// Cloudflare request-tracing header.
const CF_RAY: &str = "cf-ray";

/// Header Akamai adds when it rewrites a response.
const AKAMAI_TRANSFORMED: &str = "x-akamai-transformed";

/// Reverse proxy / CDN / WAF vendor seen in front of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeVendor {
    Cloudflare,
    Akamai,
}

impl fmt::Display for EdgeVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloudflare => write!(f, "Cloudflare"),
            Self::Akamai => write!(f, "Akamai"),
        }
    }
}

/// Signals extracted from one successful HTTP(S) response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fingerprint {
    /// URL that answered.
    pub url: String,
    /// HTTP status code of the answer.
    pub status: u16,
    /// `Server` header, if present and non-empty.
    pub server: Option<String>,
    pub edge: Option<EdgeVendor>,
}

impl Fingerprint {
    /// Build a fingerprint from response headers.
    pub fn from_headers(url: impl Into<String>, status: u16, headers: &HeaderMap) -> Self {
        let server = headers
            .get(SERVER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_string())
            .filter(|s| !s.is_empty());
        let edge = detect_edge(headers, server.as_deref());

        Self {
            url: url.into(),
            status,
            server,
            edge,
        }
    }

    /// Fold this fingerprint into an OS/tech string.
    ///
    /// The server banner is appended in parentheses (or replaces
    /// [`DETECTION_FAILED`]); an edge vendor is then appended as
    /// `[EDGE: <vendor>]`.
    pub fn apply_to(&self, os_tech: &str) -> String {
        let mut merged = os_tech.to_string();

        if let Some(server) = &self.server {
            merged = if merged == DETECTION_FAILED {
                server.clone()
            } else {
                format!("{} ({})", merged, server)
            };
        }

        if let Some(edge) = self.edge {
            merged = format!("{} [EDGE: {}]", merged, edge);
        }

        merged
    }
}

/// Evaluate the edge rules in priority order.
///
/// Every applicable rule overwrites the previous result, so a later rule in
/// the list beats an earlier one:
/// 1. non-empty `CF-RAY` header: Cloudflare
/// 2. non-empty `X-Akamai-Transformed` header: Akamai
/// 3. `Server` header containing "cloudflare" (any case): Cloudflare
pub fn detect_edge(headers: &HeaderMap, server: Option<&str>) -> Option<EdgeVendor> {
    let present = |name: &str| {
        headers
            .get(name)
            .map_or(false, |v| !v.as_bytes().is_empty())
    };

    let mut signal = None;
    if present(CF_RAY) {
        signal = Some(EdgeVendor::Cloudflare);
    }
    if present(AKAMAI_TRANSFORMED) {
        signal = Some(EdgeVendor::Akamai);
    }
    if server.map_or(false, |s| s.to_lowercase().contains("cloudflare")) {
        signal = Some(EdgeVendor::Cloudflare);
    }
    signal
}

/// Anything that can fingerprint a target's web front.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    /// Probe `address`, returning `None` when no attempt got a response.
    async fn fingerprint(&self, address: &str, port_override: Option<Port>) -> Option<Fingerprint>;
}

/// Fingerprinter backed by `reqwest`.
pub struct WebProber {
    client: Client,
    https_port: Port,
    http_port: Port,
}

impl WebProber {
    /// Prober using the standard ports 443 and 80.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        Self::with_ports(timeout, Port::HTTPS, Port::HTTP)
    }

    /// Prober with non-standard default ports.
    pub fn with_ports(
        timeout: Duration,
        https_port: Port,
        http_port: Port,
    ) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            https_port,
            http_port,
        })
    }

    /// URL for the HTTPS attempt.
    pub fn https_url(&self, address: &str, port_override: Option<Port>) -> String {
        let port = effective_port(port_override, Port::HTTPS, self.https_port);
        endpoint("https", address, port)
    }

    /// URL for the plain HTTP fallback.
    pub fn http_url(&self, address: &str, port_override: Option<Port>) -> String {
        let port = effective_port(port_override, Port::HTTP, self.http_port);
        endpoint("http", address, port)
    }

    async fn attempt(&self, url: &str) -> Result<Fingerprint, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        Ok(Fingerprint::from_headers(
            url,
            response.status().as_u16(),
            response.headers(),
        ))
    }
}

#[async_trait]
impl Fingerprinter for WebProber {
    async fn fingerprint(&self, address: &str, port_override: Option<Port>) -> Option<Fingerprint> {
        let https = self.https_url(address, port_override);
        let err = match self.attempt(&https).await {
            Ok(fingerprint) => return Some(fingerprint),
            Err(e) => e,
        };
        info!(url = %https, error = %err, "HTTPS probe failed, falling back to HTTP");

        let http = self.http_url(address, port_override);
        match self.attempt(&http).await {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                debug!(url = %http, error = %e, "HTTP probe failed");
                None
            }
        }
    }
}

/// The override wins unless it is the scheme's standard port.
fn effective_port(port_override: Option<Port>, standard: Port, default: Port) -> Port {
    match port_override {
        Some(port) if port != standard => port,
        _ => default,
    }
}

fn endpoint(scheme: &str, address: &str, port: Port) -> String {
    if address.parse::<Ipv6Addr>().is_ok() {
        format!("{}://[{}]:{}", scheme, address, port)
    } else {
        format!("{}://{}:{}", scheme, address, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    /// Serve one canned plain-HTTP response per connection.
    async fn serve_http(extra_headers: &'static str) -> Port {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\n{}Content-Length: 2\r\nConnection: close\r\n\r\nok",
                        extra_headers
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Port::new(port).unwrap()
    }

    async fn closed_port() -> Port {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        Port::new(port).unwrap()
    }

    #[test]
    fn test_edge_rules_in_priority_order() {
        assert_eq!(
            detect_edge(&headers(&[("cf-ray", "8a1b2c-AMS")]), None),
            Some(EdgeVendor::Cloudflare)
        );
        assert_eq!(
            detect_edge(&headers(&[("x-akamai-transformed", "9 - 0 pmb=mRUM,1")]), None),
            Some(EdgeVendor::Akamai)
        );
        // Later rules overwrite earlier ones.
        assert_eq!(
            detect_edge(
                &headers(&[("cf-ray", "1"), ("x-akamai-transformed", "1")]),
                None
            ),
            Some(EdgeVendor::Akamai)
        );
        assert_eq!(
            detect_edge(&headers(&[("x-akamai-transformed", "1")]), Some("CloudFlare")),
            Some(EdgeVendor::Cloudflare)
        );
        assert_eq!(detect_edge(&headers(&[("cf-ray", "")]), Some("nginx")), None);
    }

    #[test]
    fn test_apply_to_os_hint() {
        let fp = Fingerprint {
            url: "https://10.0.0.1:443".to_string(),
            status: 200,
            server: Some("nginx".to_string()),
            edge: None,
        };
        assert_eq!(fp.apply_to("Linux 5.X"), "Linux 5.X (nginx)");
        assert_eq!(fp.apply_to(DETECTION_FAILED), "nginx");
    }

    #[test]
    fn test_apply_to_with_edge() {
        let fp = Fingerprint {
            url: "https://example.com:443".to_string(),
            status: 403,
            server: Some("cloudflare".to_string()),
            edge: Some(EdgeVendor::Cloudflare),
        };
        assert_eq!(
            fp.apply_to(DETECTION_FAILED),
            "cloudflare [EDGE: Cloudflare]"
        );

        let edge_only = Fingerprint {
            server: None,
            edge: Some(EdgeVendor::Akamai),
            ..fp
        };
        assert_eq!(edge_only.apply_to("Linux"), "Linux [EDGE: Akamai]");
    }

    #[test]
    fn test_fingerprint_from_headers() {
        let fp = Fingerprint::from_headers(
            "http://10.0.0.1:80",
            200,
            &headers(&[("server", "  Apache/2.4.57  "), ("cf-ray", "abc")]),
        );
        assert_eq!(fp.server.as_deref(), Some("Apache/2.4.57"));
        assert_eq!(fp.edge, Some(EdgeVendor::Cloudflare));
    }

    #[test]
    fn test_urls_honour_override() {
        let prober = WebProber::new(Duration::from_secs(4)).unwrap();
        assert_eq!(prober.https_url("10.0.0.1", None), "https://10.0.0.1:443");
        assert_eq!(prober.http_url("10.0.0.1", None), "http://10.0.0.1:80");

        let p8443 = Port::new(8443).unwrap();
        assert_eq!(prober.https_url("host", Some(p8443)), "https://host:8443");
        assert_eq!(prober.http_url("host", Some(p8443)), "http://host:8443");

        assert_eq!(prober.https_url("host", Some(Port::HTTPS)), "https://host:443");
        assert_eq!(prober.http_url("host", Some(Port::HTTPS)), "http://host:443");
        assert_eq!(prober.http_url("host", Some(Port::HTTP)), "http://host:80");
        assert_eq!(prober.https_url("host", Some(Port::HTTP)), "https://host:80");
    }

    #[test]
    fn test_ipv6_urls_are_bracketed() {
        let prober = WebProber::new(Duration::from_secs(4)).unwrap();
        assert_eq!(prober.https_url("::1", None), "https://[::1]:443");
    }

    #[tokio::test]
    async fn test_falls_back_to_http_when_https_unreachable() {
        let http = serve_http("Server: nginx\r\n").await;
        let https = closed_port().await;
        let prober = WebProber::with_ports(Duration::from_secs(4), https, http).unwrap();

        let fp = prober.fingerprint("127.0.0.1", None).await.unwrap();
        assert!(fp.url.starts_with("http://"));
        assert_eq!(fp.server.as_deref(), Some("nginx"));
        assert!(fp.apply_to(DETECTION_FAILED).contains("nginx"));
        assert!(fp.apply_to("Linux 5.X").contains("(nginx)"));
    }

    #[tokio::test]
    async fn test_tls_failure_on_override_port_falls_back() {
        let port = serve_http("Server: lighttpd\r\nCF-RAY: 1234\r\n").await;
        let prober = WebProber::new(Duration::from_secs(4)).unwrap();

        let fp = prober.fingerprint("127.0.0.1", Some(port)).await.unwrap();
        assert_eq!(fp.url, format!("http://127.0.0.1:{}", port));
        assert_eq!(fp.apply_to("Linux"), "Linux (lighttpd) [EDGE: Cloudflare]");
    }

    #[tokio::test]
    async fn test_both_attempts_fail() {
        let https = closed_port().await;
        let http = closed_port().await;
        let prober = WebProber::with_ports(Duration::from_secs(4), https, http).unwrap();

        assert_eq!(prober.fingerprint("127.0.0.1", None).await, None);
    }
}
