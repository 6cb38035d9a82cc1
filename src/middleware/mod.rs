//! Middleware components for request processing

pub mod auth;
pub mod validator;

pub use auth::{require_bearer, AuthConfig, AuthError, AuthGate};
pub use validator::{InputValidator, ValidationError};
