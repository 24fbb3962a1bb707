//! Protocol modules.
//!
//! - `text`: JSON envelopes for requests (inbound) and frames (outbound).
//! - `room`: payload records exchanged by the room service.
//!
//! All parsers are panic-free: malformed input is reported as `RoomcastError`
//! instead of panicking, keeping the gateway resilient to hostile traffic.

pub mod room;
pub mod text;
