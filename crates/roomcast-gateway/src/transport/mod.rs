//! Transport layer.
//!
//! WebSocket and line-delimited TCP acceptors sharing one codec and one
//! connection lifecycle.

pub mod codec;
pub mod conn;
pub mod tcp;
pub mod ws;
