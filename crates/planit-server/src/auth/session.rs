use axum::http::{header, HeaderMap};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};

use crate::config::Config;

/// HTTP-only cookie carrying the enterprise session token.
pub fn session_cookie(config: &Config, token: &str) -> String {
    Cookie::build((config.session_cookie_name.clone(), token.to_string()))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(config.jwt_expires_in))
        .path("/")
        .build()
        .to_string()
}

pub fn clear_session_cookie(config: &Config) -> String {
    Cookie::build((config.session_cookie_name.clone(), ""))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(0))
        .path("/")
        .build()
        .to_string()
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value.to_string()))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/planit".into(),
            database_max_connections: 1,
            jwt_secret: "secret".into(),
            jwt_expires_in: 86_400,
            session_cookie_name: "planit_session".into(),
            cookie_secure: true,
            port: 0,
        }
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie(&config(), "tok");
        assert!(cookie.starts_with("planit_session=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=86400"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn clearing_expires_immediately() {
        let cookie = clear_session_cookie(&config());
        assert!(cookie.starts_with("planit_session="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; planit_session=abc.def.ghi; other=1"),
        );
        assert_eq!(
            cookie_token(&headers, "planit_session").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(cookie_token(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("planit_session="));
        assert_eq!(cookie_token(&headers, "planit_session"), None);
    }

    #[test]
    fn bearer_requires_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
