//! Account, session-token and social-profile service.
//!
//! Accounts register with a password and log in for a one-hour bearer token.
//! Each account may own one public profile, addressed by a handle derived from
//! the owner's name, and may follow other profiles. Every mutation re-issues
//! the caller's token so the claims it carries never go stale.

pub mod accounts;
pub mod auth;
pub mod errors;
pub mod handle;
pub mod model;
pub mod password;
pub mod profiles;
pub mod routes;
pub mod setup;
pub mod state;
pub mod store;
pub mod token;
pub mod validation;
