//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. Session (decrypt the cookie into a request-scoped [`SessionContext`])
//! 5. Rate limiting on the login route (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, RequireStaff, SessionContext, session_middleware,
};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
