//! Shared error type across roomcast crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Payload too large.
    PayloadTooLarge,
    /// Unsupported protocol version.
    UnsupportedVersion,
    /// No service or handler under that name.
    UnknownRoute,
    /// The target session is gone.
    SessionClosed,
    /// The target session's outbound queue is full.
    Backpressure,
    /// The group no longer accepts members.
    GroupClosed,
    /// A request was answered more than once.
    AlreadyResponded,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::UnknownRoute => "UNKNOWN_ROUTE",
            ClientCode::SessionClosed => "SESSION_CLOSED",
            ClientCode::Backpressure => "BACKPRESSURE",
            ClientCode::GroupClosed => "GROUP_CLOSED",
            ClientCode::AlreadyResponded => "ALREADY_RESPONDED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RoomcastError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RoomcastError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    #[error("unknown route: {0}")]
    UnknownRoute(String),
    #[error("session {0} closed")]
    SessionClosed(u64),
    #[error("session {0} outbound queue full")]
    Backpressure(u64),
    #[error("group {0} closed")]
    GroupClosed(String),
    #[error("request already responded")]
    AlreadyResponded,
    #[error("internal: {0}")]
    Internal(String),
}

impl RoomcastError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RoomcastError::BadRequest(_) => ClientCode::BadRequest,
            RoomcastError::PayloadTooLarge { .. } => ClientCode::PayloadTooLarge,
            RoomcastError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RoomcastError::UnknownRoute(_) => ClientCode::UnknownRoute,
            RoomcastError::SessionClosed(_) => ClientCode::SessionClosed,
            RoomcastError::Backpressure(_) => ClientCode::Backpressure,
            RoomcastError::GroupClosed(_) => ClientCode::GroupClosed,
            RoomcastError::AlreadyResponded => ClientCode::AlreadyResponded,
            RoomcastError::Internal(_) => ClientCode::Internal,
        }
    }

    /// True for failures that only concern one recipient of a fan-out.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(
            self,
            RoomcastError::SessionClosed(_) | RoomcastError::Backpressure(_)
        )
    }
}
