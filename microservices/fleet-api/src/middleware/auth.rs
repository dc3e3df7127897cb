//! Authentication Middleware
//!
//! JWT bearer validation and role-based route guards.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Error;

/// Paths reachable without a bearer token.
const PUBLIC_PATHS: &[&str] = &["/health", "/ready", "/api/public", "/swagger-ui", "/api-docs"];

/// Roles allowed to use the fleet CRUD endpoints.
const FLEET_ROLES: &[&str] = &["ADMIN", "USER"];

pub struct AuthMiddleware {
    decoding_key: DecodingKey,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub roles: Vec<String>,
}

/// Resolved caller identity, installed as a request extension for
/// downstream layers (rate limiting keys on it).
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub sub: String,
    pub roles: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing bearer token")]
    MissingToken,
}

impl AuthMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Validate JWT token
    pub fn validate_jwt(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// Extract token from Authorization header
    pub fn extract_token(auth_header: &str) -> Option<&str> {
        auth_header.strip_prefix("Bearer ")
    }
}

pub(crate) fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|prefix| path.starts_with(prefix))
}

fn has_fleet_role(roles: &[String]) -> bool {
    roles.iter().any(|role| FLEET_ROLES.contains(&role.as_str()))
}

/// Authentication middleware.
///
/// Resolves the caller identity whenever a valid bearer token is present,
/// then enforces role rules on protected paths. Public paths pass through
/// with whatever identity was resolved.
pub async fn authenticate(
    State(auth): State<Arc<AuthMiddleware>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(AuthMiddleware::extract_token)
    {
        Some(token) => auth.validate_jwt(token),
        None => Err(AuthError::MissingToken),
    };

    if let Ok(claims) = &claims {
        request.extensions_mut().insert(CurrentUser {
            sub: claims.sub.clone(),
            roles: claims.roles.clone(),
        });
    }

    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    match claims {
        Ok(claims) if has_fleet_role(&claims.roles) => next.run(request).await,
        Ok(claims) => {
            tracing::warn!(sub = %claims.sub, "Access denied: no fleet role");
            Error::Forbidden.into_response()
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejecting unauthenticated request");
            Error::Unauthorized.into_response()
        }
    }
}
