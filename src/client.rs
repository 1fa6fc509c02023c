use axum::http::{HeaderMap, Method, header};

use crate::error::{Result, ServiceError};

pub const FORWARDED_FOR: &str = "x-forwarded-for";
pub const REAL_IP: &str = "x-real-ip";
pub const UNKNOWN_CLIENT: &str = "0.0.0.0";

// User-Agent fragments we refuse to serve
const SUSPICIOUS_AGENTS: [&str; 8] = [
    "bot", "crawler", "spider", "scraper", "curl", "wget", "python", "java",
];

// Proxy placeholders that carry no address
fn usable(value: &str) -> Option<&str> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
        None
    } else {
        Some(value)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// X-Forwarded-For (first hop), X-Real-IP, remote address, then 0.0.0.0
pub fn extract_client_key(headers: &HeaderMap, remote_addr: Option<&str>) -> String {
    let forwarded = header_str(headers, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .and_then(usable);
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    if let Some(ip) = header_str(headers, REAL_IP).and_then(usable) {
        return ip.to_string();
    }

    remote_addr
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

// Malformed (400) or suspicious (403) requests never reach the limiter
pub fn classify(method: &Method, headers: &HeaderMap, max_content_length: u64) -> Result<()> {
    if method != Method::GET {
        return Err(ServiceError::MalformedRequest(format!("method {} not allowed", method)));
    }

    if let Some(value) = headers.get(header::CONTENT_LENGTH) {
        let length = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| ServiceError::MalformedRequest("unparseable content length".to_string()))?;
        if length > max_content_length {
            return Err(ServiceError::MalformedRequest(format!(
                "content length {} exceeds {}",
                length, max_content_length
            )));
        }
    }

    // Non-UTF8 agents are treated like missing ones
    let agent = header_str(headers, header::USER_AGENT.as_str())
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .ok_or_else(|| ServiceError::SuspiciousRequest("missing user agent".to_string()))?;

    let lower = agent.to_ascii_lowercase();
    if let Some(pattern) = SUSPICIOUS_AGENTS.iter().find(|p| lower.contains(*p)) {
        return Err(ServiceError::SuspiciousRequest(format!(
            "user agent matches '{}'",
            pattern
        )));
    }

    Ok(())
}

// Make a header value safe to put in a log line
pub fn sanitize_for_logging(input: Option<&str>) -> String {
    match input {
        None => "null".to_string(),
        Some(s) => s
            .chars()
            .map(|c| if c.is_control() { '_' } else { c })
            .take(200)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn browser() -> HeaderMap {
        headers(&[("user-agent", "Mozilla/5.0 (X11; Linux x86_64)")])
    }

    #[test]
    fn forwarded_for_uses_first_entry() {
        let h = headers(&[("x-forwarded-for", "203.0.113.1, 10.0.0.1")]);
        assert_eq!(extract_client_key(&h, Some("127.0.0.1")), "203.0.113.1");
    }

    #[test]
    fn unknown_forwarded_for_falls_back_to_remote() {
        let h = headers(&[("x-forwarded-for", "unknown")]);
        assert_eq!(extract_client_key(&h, Some("198.51.100.7")), "198.51.100.7");

        let h = headers(&[("x-forwarded-for", "UNKNOWN")]);
        assert_eq!(extract_client_key(&h, Some("198.51.100.7")), "198.51.100.7");
    }

    #[test]
    fn real_ip_is_second_choice() {
        let h = headers(&[("x-forwarded-for", "  "), ("x-real-ip", " 203.0.113.5 ")]);
        assert_eq!(extract_client_key(&h, Some("127.0.0.1")), "203.0.113.5");

        let h = headers(&[("x-real-ip", "unknown")]);
        assert_eq!(extract_client_key(&h, Some("127.0.0.1")), "127.0.0.1");
    }

    #[test]
    fn sentinel_when_nothing_is_known() {
        assert_eq!(extract_client_key(&HeaderMap::new(), None), UNKNOWN_CLIENT);
        assert_eq!(extract_client_key(&HeaderMap::new(), Some("")), UNKNOWN_CLIENT);
    }

    #[test]
    fn extraction_is_deterministic() {
        let h = headers(&[("x-forwarded-for", "192.168.1.100, 10.0.0.1")]);
        let first = extract_client_key(&h, Some("127.0.0.1"));
        for _ in 0..10 {
            assert_eq!(extract_client_key(&h, Some("127.0.0.1")), first);
        }
    }

    #[test]
    fn browser_get_is_accepted() {
        assert!(classify(&Method::GET, &browser(), 1024).is_ok());
    }

    #[test]
    fn non_get_is_malformed() {
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            assert!(matches!(
                classify(&method, &browser(), 1024),
                Err(ServiceError::MalformedRequest(_))
            ));
        }
    }

    #[test]
    fn content_length_is_bounded() {
        let mut h = browser();
        h.insert(header::CONTENT_LENGTH, HeaderValue::from_static("1024"));
        assert!(classify(&Method::GET, &h, 1024).is_ok());

        h.insert(header::CONTENT_LENGTH, HeaderValue::from_static("1025"));
        assert!(matches!(
            classify(&Method::GET, &h, 1024),
            Err(ServiceError::MalformedRequest(_))
        ));

        h.insert(header::CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert!(matches!(
            classify(&Method::GET, &h, 1024),
            Err(ServiceError::MalformedRequest(_))
        ));
    }

    #[test]
    fn missing_or_blank_agent_is_suspicious() {
        assert!(matches!(
            classify(&Method::GET, &HeaderMap::new(), 1024),
            Err(ServiceError::SuspiciousRequest(_))
        ));
        let h = headers(&[("user-agent", "   ")]);
        assert!(matches!(
            classify(&Method::GET, &h, 1024),
            Err(ServiceError::SuspiciousRequest(_))
        ));
    }

    #[test]
    fn tool_agents_are_suspicious() {
        for ua in ["curl/8.4.0", "Wget/1.21", "python-requests/2.31", "Googlebot/2.1", "Java/17"] {
            let h = headers(&[("user-agent", ua)]);
            assert!(
                matches!(classify(&Method::GET, &h, 1024), Err(ServiceError::SuspiciousRequest(_))),
                "{} was accepted",
                ua
            );
        }
    }

    #[test]
    fn sanitize_replaces_control_chars_and_caps_length() {
        assert_eq!(sanitize_for_logging(None), "null");
        assert_eq!(sanitize_for_logging(Some("a\r\nb\tc")), "a__b_c");
        assert_eq!(sanitize_for_logging(Some(&"x".repeat(500))).len(), 200);
    }
}
