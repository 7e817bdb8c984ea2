use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::auth::dto::TokenPair;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn cookie(name: &str, value: &str, max_age: Duration) -> HeaderValue {
    let raw = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        name,
        value,
        max_age.as_secs()
    );
    // JWTs are base64url with dots, always a valid header value.
    HeaderValue::from_str(&raw).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `Set-Cookie` headers for a freshly issued pair.
pub fn session_cookies(pair: &TokenPair, access_ttl: Duration, refresh_ttl: Duration) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie(ACCESS_COOKIE, &pair.access_token, access_ttl),
    );
    headers.append(
        header::SET_COOKIE,
        cookie(REFRESH_COOKIE, &pair.refresh_token, refresh_ttl),
    );
    headers
}

/// `Set-Cookie` headers that expire both session cookies.
pub fn clear_session_cookies() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, cookie(ACCESS_COOKIE, "", Duration::ZERO));
    headers.append(header::SET_COOKIE, cookie(REFRESH_COOKIE, "", Duration::ZERO));
    headers
}

/// Value of a named cookie from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookies_are_http_only_and_secure() {
        let pair = TokenPair {
            access_token: "aaa.bbb.ccc".into(),
            refresh_token: "rrr.sss.ttt".into(),
        };
        let headers = session_cookies(&pair, Duration::from_secs(300), Duration::from_secs(3600));
        let values: Vec<_> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("accessToken=aaa.bbb.ccc;"));
        assert!(values[0].contains("Max-Age=300"));
        assert!(values[1].starts_with("refreshToken=rrr.sss.ttt;"));
        for v in &values {
            assert!(v.contains("HttpOnly") && v.contains("Secure"));
        }
    }

    #[test]
    fn cleared_cookies_expire_immediately() {
        let headers = clear_session_cookies();
        assert!(headers
            .get_all(header::SET_COOKIE)
            .iter()
            .all(|v| v.to_str().unwrap().contains("Max-Age=0")));
    }

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refreshToken=abc.def; accessToken="),
        );
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE), Some("abc.def"));
        assert_eq!(read_cookie(&headers, ACCESS_COOKIE), None);
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
