//! Identity provider adapter.
//!
//! Bearer tokens stand in for an external identity provider: each non-admin
//! token is bound to a subject, and a validated token yields the caller's
//! [`Identity`](crate::types::Identity).

mod helpers;
mod middleware;
mod token;

pub use middleware::{MaybeIdentity, RequireAdmin, RequireIdentity};
pub use token::{TokenGenerator, parse_token};
