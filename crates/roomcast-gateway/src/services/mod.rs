//! Built-in services.

pub mod room;

pub use room::RoomService;
