//! Room payload records.

use serde::{Deserialize, Serialize};

/// Route of the membership snapshot pushed to a joiner.
pub const ROUTE_MEMBERS: &str = "onMembers";
/// Route of the join notification broadcast to the room.
pub const ROUTE_NEW_USER: &str = "onNewUser";
/// Route of chat messages broadcast to the room.
pub const ROUTE_MESSAGE: &str = "onMessage";

/// A message a user sent to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub name: String,
    pub content: String,
}

/// Broadcast when a new user joins the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub content: String,
}

/// Uids of every room member at the time of a join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllMembers {
    pub members: Vec<String>,
}

/// Result of joining the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub code: i32,
    pub result: String,
}

impl JoinResponse {
    pub fn success() -> Self {
        Self {
            code: 0,
            result: "success".into(),
        }
    }
}
