//! Byte traffic counters, attached as pipeline stages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use roomcast_core::error::Result;

use super::Pipeline;
use crate::realtime::SessionId;

/// Inbound/outbound byte totals for the process lifetime. Never reset.
#[derive(Debug, Default)]
pub struct TrafficCounter {
    inbound: AtomicU64,
    outbound: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrafficSnapshot {
    pub inbound_bytes: u64,
    pub outbound_bytes: u64,
}

impl TrafficCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an inbound frame. Returns it untouched.
    pub fn inbound(&self, _session: SessionId, data: Bytes) -> Result<Bytes> {
        self.inbound.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(data)
    }

    /// Count an outbound frame. Returns it untouched.
    pub fn outbound(&self, _session: SessionId, data: Bytes) -> Result<Bytes> {
        self.outbound.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(data)
    }

    pub fn inbound_bytes(&self) -> u64 {
        self.inbound.load(Ordering::Relaxed)
    }

    pub fn outbound_bytes(&self) -> u64 {
        self.outbound.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            inbound_bytes: self.inbound_bytes(),
            outbound_bytes: self.outbound_bytes(),
        }
    }

    /// Append this counter to both directions of `pipeline`.
    pub fn attach(self: &Arc<Self>, pipeline: &mut Pipeline) {
        let counter = Arc::clone(self);
        pipeline
            .inbound
            .push_back(move |s: SessionId, d: Bytes| counter.inbound(s, d));
        let counter = Arc::clone(self);
        pipeline
            .outbound
            .push_back(move |s: SessionId, d: Bytes| counter.outbound(s, d));
    }
}
