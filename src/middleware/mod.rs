//! Middleware for the ReReadery API
//!
//! Request tracing, rate limiting, security headers, and authentication.

pub mod auth;
mod rate_limiter;
mod security;
mod logging;

pub use auth::{AdminUser, AuthenticatedUser};
pub use rate_limiter::{rate_limit, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use logging::request_tracing;
