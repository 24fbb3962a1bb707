//! roomcast gateway library entry.
//!
//! This crate wires the transports, pipeline, dispatcher, realtime core, and
//! the room service into a chat server. It is intended to be consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod pipeline;
pub mod realtime;
pub mod router;
pub mod server;
pub mod services;
pub mod transport;
