//! Realtime runtime for the gateway.
//!
//! Session lifecycle, room membership with snapshot broadcast, and the
//! periodic reporter.

pub mod core;
pub mod reporter;

pub use core::{
    BindOutcome, CloseHook, Delivery, Group, RequestCtx, Session, SessionHandle, SessionId,
    SessionRegistry,
};
pub use reporter::{Report, Reporter};
