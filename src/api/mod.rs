//! The `api` module exposes the session pool to the outside world.
//!
//! `control` holds the transport-independent intents (add, remove, remove
//! all, count); `http` binds them to axum routes.

pub mod control;
pub mod http;
pub mod request;

pub use control::{AddOutcome, AddResult, ControlApi, RemoveOutcome};
pub use request::{AddRequest, CountResponse, RemoveRequest};
