//! The auth-service client for Vigil.
//!
//! Vigil doesn't verify credentials itself — that's the identity
//! provider's job. This crate defines the [`AuthApi`] trait (the seam
//! the session state machine drives) and [`HttpAuthApi`], the reqwest
//! implementation speaking the service's JSON endpoints:
//!
//! - `POST /authenticate` — email/password login
//! - `POST /refresh-token` — exchange a refresh token for a new pair
//!
//! One call, one attempt: the client performs **no retry or backoff**.
//! Whether a failed exchange is retried is a session-policy decision
//! that belongs to the caller, and the session layer's policy is that a
//! failed refresh ends the session.

#![allow(async_fn_in_trait)]

mod api;
mod error;
mod http;

pub use api::{AuthApi, LoginOutcome};
pub use error::AuthError;
pub use http::HttpAuthApi;
