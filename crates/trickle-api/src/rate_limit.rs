// Rate-limit metadata returned with every cloud response.
//
// The cloud enforces a daily request quota and reports it through
// `x-ratelimit-*` headers. The bridge only *surfaces* this for
// operability — it never gates a call on it; a blown quota comes back
// as an HTTP 429.

use std::fmt;

use reqwest::header::HeaderMap;

/// Remaining-quota metadata parsed from response headers.
///
/// All fields are optional — some endpoints (and every mock) omit them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Reset instant as reported by the cloud (RFC 3339 string, passed
    /// through untouched for logging).
    pub reset: Option<String>,
}

impl RateLimit {
    /// Parse the `x-ratelimit-limit` / `-remaining` / `-reset` headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parse_u32 = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
        };

        Self {
            limit: parse_u32("x-ratelimit-limit"),
            remaining: parse_u32("x-ratelimit-remaining"),
            reset: headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.remaining, self.limit) {
            (Some(remaining), Some(limit)) => {
                write!(f, "{remaining}/{limit} requests remaining")?;
                if let Some(ref reset) = self.reset {
                    write!(f, " until {reset}")?;
                }
                Ok(())
            }
            _ => write!(f, "quota unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn parses_all_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("1700"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("1693"));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from_static("2026-08-07T00:00:00Z"),
        );

        let rl = RateLimit::from_headers(&headers);
        assert_eq!(rl.limit, Some(1700));
        assert_eq!(rl.remaining, Some(1693));
        assert_eq!(rl.reset.as_deref(), Some("2026-08-07T00:00:00Z"));
        assert_eq!(
            rl.to_string(),
            "1693/1700 requests remaining until 2026-08-07T00:00:00Z"
        );
    }

    #[test]
    fn missing_headers_display_as_unknown() {
        let rl = RateLimit::from_headers(&HeaderMap::new());
        assert_eq!(rl, RateLimit::default());
        assert_eq!(rl.to_string(), "quota unknown");
    }

    #[test]
    fn garbage_values_are_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("lots"));
        let rl = RateLimit::from_headers(&headers);
        assert_eq!(rl.limit, None);
    }
}
