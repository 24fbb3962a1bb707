//! roomcast core: transport-agnostic protocol primitives, room payloads, and
//! the shared error type.
//!
//! This crate defines the wire-level contracts and error surface shared by the
//! gateway and its services. It intentionally carries no transport or runtime
//! dependencies so it can be reused by clients and test tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `RoomcastError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, RoomcastError};
