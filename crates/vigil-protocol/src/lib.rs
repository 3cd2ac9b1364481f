//! Wire types for the auth service consumed by Vigil.
//!
//! This crate defines every type that crosses the boundary between the
//! session layer and the external auth service: the request/response
//! bodies of `POST /authenticate` and `POST /refresh-token`, the error
//! body the service returns on a non-2xx status, and the [`Session`]
//! record the rest of the stack passes around.
//!
//! The auth service speaks camelCase JSON (`accessToken`, `expiryTime`),
//! so every wire type carries `#[serde(rename_all = "camelCase")]` — a
//! mismatch here means the client silently fails to parse responses,
//! which is why the tests below pin the exact JSON shapes.

mod types;

pub use types::{
    ApiErrorBody, AuthenticateRequest, AuthenticateResponse, RefreshRequest,
    RefreshResponse, Role, Session, UserIdentity,
};
