//! Realtime core components for the gateway runtime.
//!
//! Sessions and their registry, the broadcast group, and the per-request
//! context shared across services.

mod group;
mod realtime;
mod session;
mod session_registry;

pub use group::{Delivery, Group};
pub use realtime::RequestCtx;
pub use session::{BindOutcome, CloseHook, CloseHooks, Session, SessionHandle, SessionId};
pub use session_registry::SessionRegistry;
