//! Rate Limit Filter
//!
//! Axum middleware that keys every request to a caller identity, consults
//! the token-bucket limiter, and either forwards the request with
//! informational headers or rejects it with 429. Health and API
//! documentation paths bypass limiting entirely.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::error_body;
use crate::middleware::CurrentUser;
use crate::security::{RateLimitResult, RateLimitService};

const HEADER_LIMIT: &str = "X-RateLimit-Limit";
const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
const HEADER_RESET: &str = "X-RateLimit-Reset";

/// Path prefixes exempt from rate limiting: health probes and API docs.
const WHITELISTED_PATHS: &[&str] = &["/health", "/ready", "/swagger-ui", "/api-docs"];

pub(crate) fn is_whitelisted(path: &str) -> bool {
    WHITELISTED_PATHS
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Derive the rate limit key for a request.
///
/// Precedence: authenticated principal, then the first (client) entry of
/// `X-Forwarded-For`, then the socket remote address.
pub(crate) fn derive_key(
    user: Option<&CurrentUser>,
    forwarded_for: Option<&str>,
    remote_addr: Option<SocketAddr>,
) -> String {
    if let Some(user) = user {
        return format!("user:{}", user.sub);
    }
    if let Some(forwarded) = forwarded_for {
        if let Some(client_ip) = forwarded.split(',').next() {
            let client_ip = client_ip.trim();
            if !client_ip.is_empty() {
                return format!("ip:{}", client_ip);
            }
        }
    }
    match remote_addr {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

/// Rate limiting middleware.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimitService>>,
    request: Request,
    next: Next,
) -> Response {
    if is_whitelisted(request.uri().path()) {
        return next.run(request).await;
    }

    let user = request.extensions().get::<CurrentUser>();
    let forwarded_for = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok());
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = derive_key(user, forwarded_for, remote_addr);

    match limiter.try_consume(&key) {
        Ok(result) if result.allowed => {
            let mut response = next.run(request).await;
            set_rate_limit_headers(response.headers_mut(), &result);
            response
        }
        Ok(result) => {
            tracing::debug!(key = %key, retry_after = result.retry_after_seconds, "Rate limit exceeded");
            too_many_requests(&result)
        }
        Err(err) => {
            // Fail open: a limiter fault must never block traffic.
            tracing::warn!(error = %err, "Rate limiter failure, allowing request through");
            next.run(request).await
        }
    }
}

fn set_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert(HEADER_LIMIT, HeaderValue::from(result.capacity));
    headers.insert(HEADER_REMAINING, HeaderValue::from(result.remaining_tokens));
    headers.insert(HEADER_RESET, HeaderValue::from(result.reset_epoch_seconds));
}

fn too_many_requests(result: &RateLimitResult) -> Response {
    let message = format!(
        "Rate limit exceeded. Retry after {} seconds.",
        result.retry_after_seconds
    );
    let body = Json(error_body(
        StatusCode::TOO_MANY_REQUESTS,
        "Too Many Requests",
        &message,
    ));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    set_rate_limit_headers(response.headers_mut(), result);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(result.retry_after_seconds));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(sub: &str) -> CurrentUser {
        CurrentUser {
            sub: sub.to_string(),
            roles: vec!["USER".to_string()],
        }
    }

    fn remote() -> Option<SocketAddr> {
        Some("192.168.1.100:51234".parse().unwrap())
    }

    #[test]
    fn whitelists_health_and_docs_paths() {
        assert!(is_whitelisted("/health"));
        assert!(is_whitelisted("/ready"));
        assert!(is_whitelisted("/swagger-ui/index.html"));
        assert!(is_whitelisted("/api-docs"));
        assert!(!is_whitelisted("/api/vehicles"));
    }

    #[test]
    fn prefers_authenticated_principal_over_forwarded_header() {
        let key = derive_key(Some(&user("bob")), Some("9.9.9.9"), remote());

        assert_eq!(key, "user:bob");
    }

    #[test]
    fn falls_back_to_forwarded_header_when_unauthenticated() {
        let key = derive_key(None, Some("203.0.113.1"), remote());

        assert_eq!(key, "ip:203.0.113.1");
    }

    #[test]
    fn uses_first_entry_of_multi_ip_forwarded_header() {
        let key = derive_key(None, Some("203.0.113.1, 198.51.100.1, 192.0.2.1"), remote());

        assert_eq!(key, "ip:203.0.113.1");
    }

    #[test]
    fn falls_back_to_remote_address_without_forwarded_header() {
        let key = derive_key(None, None, remote());

        assert_eq!(key, "ip:192.168.1.100");
    }

    #[test]
    fn ignores_blank_forwarded_header() {
        let key = derive_key(None, Some("  "), remote());

        assert_eq!(key, "ip:192.168.1.100");
    }
}
