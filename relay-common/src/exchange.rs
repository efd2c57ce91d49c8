//! Exchange entries recorded by the authorization checker.
//!
//! One entry groups a captured baseline exchange with its reduced-privilege
//! replay (and, when enabled, an unauthenticated replay) plus the
//! enforcement verdicts for both comparisons.

use serde::{Deserialize, Serialize};

use crate::http;

/// Enforcement-status labels shown in the results table.
///
/// The labels are stored verbatim in exchange entries and state files, so
/// entries written by older builds keep their original wording.
pub mod status {
    /// Access control was bypassed by the replay.
    pub const BYPASSED: &str = "Bypassed!";

    /// Access control held up against the replay.
    pub const ENFORCED: &str = "Enforced!";

    /// The responses differ but no enforcement detector matched.
    pub const POSSIBLY_ENFORCED: &str =
        "Is enforced??? (please configure enforcement detector)";

    /// The comparison was never performed for this entry.
    pub const NOT_EVALUATED: &str = "Disabled";
}

/// Network coordinates of a captured exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpService {
    pub host: String,
    pub port: u16,
    /// `"http"` or `"https"`.
    pub protocol: String,
}

impl HttpService {
    pub fn new(host: impl Into<String>, port: u16, protocol: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: protocol.into(),
        }
    }

    /// Absolute URL for a request target against this service.
    ///
    /// Targets that are already absolute are returned unchanged. The port is
    /// omitted when it is the default for the protocol.
    pub fn url_for(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let default_port = if self.protocol == "https" { 443 } else { 80 };
        if self.port == default_port {
            format!("{}://{}{}", self.protocol, self.host, target)
        } else {
            format!("{}://{}:{}{}", self.protocol, self.host, self.port, target)
        }
    }
}

/// One raw request/response capture against a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPair {
    pub service: HttpService,
    pub request: Vec<u8>,
    pub response: Vec<u8>,
}

impl CapturedPair {
    pub fn new(service: HttpService, request: Vec<u8>, response: Vec<u8>) -> Self {
        Self {
            service,
            request,
            response,
        }
    }
}

/// One row of the exchange log.
///
/// Owned exclusively by the log once appended; the presentation layer only
/// reads. The `number` is assigned by the log at append time, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeEntry {
    /// Monotonic request number, assigned inside the log lock.
    pub number: u64,
    /// Method of the baseline request.
    pub method: String,
    /// Absolute URL of the baseline request.
    pub url: String,
    /// The original capture.
    pub baseline: CapturedPair,
    /// The reduced-privilege replay compared against the baseline.
    pub replay: CapturedPair,
    /// The credential-free replay; absent when the check was disabled.
    pub unauthenticated: Option<CapturedPair>,
    /// Verdict of the authenticated comparison.
    pub status: String,
    /// Verdict of the unauthenticated comparison, stored even when the
    /// unauthenticated pair is absent.
    pub status_unauthenticated: String,
}

impl ExchangeEntry {
    /// Build an entry from its pairs and verdicts.
    ///
    /// Method and URL are derived from the baseline request; the number is
    /// assigned when the entry enters the log.
    pub fn new(
        baseline: CapturedPair,
        replay: CapturedPair,
        unauthenticated: Option<CapturedPair>,
        status: impl Into<String>,
        status_unauthenticated: impl Into<String>,
    ) -> Self {
        let (method, url) = match http::request_line(&baseline.request) {
            Some((method, target)) => {
                let url = baseline.service.url_for(&target);
                (method, url)
            }
            None => (String::new(), String::new()),
        };
        Self {
            number: 0,
            method,
            url,
            baseline,
            replay,
            unauthenticated,
            status: status.into(),
            status_unauthenticated: status_unauthenticated.into(),
        }
    }

    /// Verdict of the unauthenticated comparison as it should be displayed.
    ///
    /// When the unauthenticated pair is absent the stored label must read as
    /// not evaluated, whatever the file carried.
    pub fn unauthenticated_status(&self) -> &str {
        if self.unauthenticated.is_none() {
            status::NOT_EVALUATED
        } else {
            &self.status_unauthenticated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(host: &str, port: u16, protocol: &str, request: &[u8]) -> CapturedPair {
        CapturedPair::new(
            HttpService::new(host, port, protocol),
            request.to_vec(),
            b"HTTP/1.1 200 OK\r\n\r\n".to_vec(),
        )
    }

    #[test]
    fn test_url_for_default_and_explicit_port() {
        let https = HttpService::new("example.com", 443, "https");
        assert_eq!(https.url_for("/api"), "https://example.com/api");

        let odd_port = HttpService::new("example.com", 8443, "https");
        assert_eq!(odd_port.url_for("/api"), "https://example.com:8443/api");

        let absolute = HttpService::new("example.com", 80, "http");
        assert_eq!(
            absolute.url_for("http://other.example/x"),
            "http://other.example/x"
        );
    }

    #[test]
    fn test_entry_derives_method_and_url() {
        let entry = ExchangeEntry::new(
            pair("api.example.com", 443, "https", b"POST /v1/users HTTP/1.1\r\n\r\n"),
            pair("api.example.com", 443, "https", b"POST /v1/users HTTP/1.1\r\n\r\n"),
            None,
            status::BYPASSED,
            status::NOT_EVALUATED,
        );

        assert_eq!(entry.method, "POST");
        assert_eq!(entry.url, "https://api.example.com/v1/users");
    }

    #[test]
    fn test_unauthenticated_status_reads_not_evaluated_when_pair_absent() {
        let mut entry = ExchangeEntry::new(
            pair("a", 80, "http", b"GET / HTTP/1.1\r\n\r\n"),
            pair("a", 80, "http", b"GET / HTTP/1.1\r\n\r\n"),
            None,
            status::ENFORCED,
            status::BYPASSED,
        );

        // The stored label survives, the interpretation does not use it.
        assert_eq!(entry.status_unauthenticated, status::BYPASSED);
        assert_eq!(entry.unauthenticated_status(), status::NOT_EVALUATED);

        entry.unauthenticated = Some(pair("a", 80, "http", b"GET / HTTP/1.1\r\n\r\n"));
        assert_eq!(entry.unauthenticated_status(), status::BYPASSED);
    }
}
