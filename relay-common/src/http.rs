//! Minimal raw-HTTP inspection helpers.
//!
//! Captured requests are stored as raw bytes; these helpers pull the few
//! facts the rest of the tool needs (request line, individual headers)
//! without a full parser. Lookup is line-oriented and stops at the blank
//! line before the body, so binary bodies are never scanned.

/// Split the request line of a raw HTTP message into method and target.
pub fn request_line(raw: &[u8]) -> Option<(String, String)> {
    let first = raw.split(|&b| b == b'\n').next()?;
    let text = std::str::from_utf8(trim_cr(first)).ok()?;
    let mut parts = text.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method.to_string(), target.to_string()))
}

/// Case-insensitive lookup of a header value in a raw HTTP message head.
///
/// Returns the value of the first matching header, trimmed.
pub fn header_value(raw: &[u8], name: &str) -> Option<String> {
    let mut lines = raw.split(|&b| b == b'\n');
    lines.next()?; // request or status line

    for line in lines {
        let line = trim_cr(line);
        if line.is_empty() {
            break;
        }
        let Ok(text) = std::str::from_utf8(line) else {
            continue;
        };
        if let Some((key, value)) = text.split_once(':') {
            if key.trim().eq_ignore_ascii_case(name) {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] = b"GET /account/42 HTTP/1.1\r\n\
Host: app.example.com\r\n\
Cookie: session=abc123\r\n\
Authorization: Bearer tok\r\n\
\r\n\
cookie-lookalike: in-body";

    #[test]
    fn test_request_line() {
        assert_eq!(
            request_line(REQUEST),
            Some(("GET".to_string(), "/account/42".to_string()))
        );
        assert_eq!(request_line(b""), None);
        assert_eq!(request_line(b"garbage-without-target"), None);
    }

    #[test]
    fn test_header_value_is_case_insensitive() {
        assert_eq!(
            header_value(REQUEST, "cookie"),
            Some("session=abc123".to_string())
        );
        assert_eq!(
            header_value(REQUEST, "AUTHORIZATION"),
            Some("Bearer tok".to_string())
        );
        assert_eq!(header_value(REQUEST, "X-Missing"), None);
    }

    #[test]
    fn test_header_lookup_stops_at_body() {
        assert_eq!(header_value(REQUEST, "cookie-lookalike"), None);
    }
}
