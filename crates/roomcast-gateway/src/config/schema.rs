use std::net::SocketAddr;

use serde::Deserialize;
use roomcast_core::error::{Result, RoomcastError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub room: RoomSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RoomcastError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.room.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    /// WebSocket acceptor address.
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Optional line-delimited JSON acceptor over plain TCP.
    #[serde(default)]
    pub tcp_listen: Option<String>,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Per-session outbound queue capacity (frames).
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ws_path: default_ws_path(),
            tcp_listen: None,
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        self.tcp_listen_addr()?;
        if !self.ws_path.starts_with('/') {
            return Err(RoomcastError::BadRequest(
                "gateway.ws_path must start with '/'".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(RoomcastError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(RoomcastError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RoomcastError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(64..=1_048_576).contains(&self.max_frame_bytes) {
            return Err(RoomcastError::BadRequest(
                "gateway.max_frame_bytes must be between 64 and 1048576".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(RoomcastError::BadRequest(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("gateway.listen", &self.listen)
    }

    pub fn tcp_listen_addr(&self) -> Result<Option<SocketAddr>> {
        self.tcp_listen
            .as_deref()
            .map(|s| parse_addr("gateway.tcp_listen", s))
            .transpose()
    }
}

fn parse_addr(field: &str, s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|e| RoomcastError::BadRequest(format!("{field} must be a valid SocketAddr: {e}")))
}

fn default_listen() -> String {
    "0.0.0.0:3250".into()
}
fn default_ws_path() -> String {
    "/roomcast".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    4096
}
fn default_outbound_queue() -> usize {
    1024
}

/// How a joining session gets its uid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UidStrategy {
    /// Use the connection's session id.
    #[default]
    Session,
    /// Generate a random UUID.
    Generated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomSection {
    #[serde(default = "default_room_name")]
    pub name: String,

    #[serde(default)]
    pub uid: UidStrategy,

    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl Default for RoomSection {
    fn default() -> Self {
        Self {
            name: default_room_name(),
            uid: UidStrategy::default(),
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

impl RoomSection {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RoomcastError::BadRequest("room.name must not be empty".into()));
        }
        if !(1000..=3_600_000).contains(&self.report_interval_ms) {
            return Err(RoomcastError::BadRequest(
                "room.report_interval_ms must be between 1000 and 3600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_room_name() -> String {
    "room".into()
}
fn default_report_interval_ms() -> u64 {
    60000
}
