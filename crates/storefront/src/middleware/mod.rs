//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, in-memory store, signed cookie)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    AdminFlag, AuthRejection, OptionalAccount, RequireAdmin, clear_session, set_admin,
    set_current_account,
};
pub use request_id::request_id_middleware;
pub use session::{SessionKeyError, create_session_layer};
