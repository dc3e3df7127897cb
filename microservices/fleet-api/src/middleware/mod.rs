//! Middleware Module

mod auth;

pub use auth::{authenticate, AuthMiddleware, Claims, CurrentUser};
