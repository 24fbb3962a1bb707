//! Inbound/outbound message pipeline.
//!
//! Every frame a session receives passes through `Pipeline::inbound` before it
//! is decoded, and every encoded frame passes through `Pipeline::outbound`
//! before the transport writes it. Stages run in insertion order; the first
//! error aborts the frame.

pub mod traffic;

use std::sync::Arc;

use bytes::Bytes;

use roomcast_core::error::Result;

use crate::realtime::SessionId;

pub use traffic::{TrafficCounter, TrafficSnapshot};

/// One pipeline stage. Closures `Fn(SessionId, Bytes) -> Result<Bytes>` are
/// stages too.
pub trait PipelineStage: Send + Sync {
    fn process(&self, session: SessionId, data: Bytes) -> Result<Bytes>;
}

impl<F> PipelineStage for F
where
    F: Fn(SessionId, Bytes) -> Result<Bytes> + Send + Sync,
{
    fn process(&self, session: SessionId, data: Bytes) -> Result<Bytes> {
        self(session, data)
    }
}

/// Ordered list of stages for one direction.
#[derive(Default)]
pub struct Chain {
    stages: Vec<Arc<dyn PipelineStage>>,
}

impl Chain {
    pub fn push_back<S: PipelineStage + 'static>(&mut self, stage: S) {
        self.stages.push(Arc::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn process(&self, session: SessionId, data: Bytes) -> Result<Bytes> {
        self.stages
            .iter()
            .try_fold(data, |data, stage| stage.process(session, data))
    }
}

/// Both directions. Built once at startup, then shared read-only.
#[derive(Default)]
pub struct Pipeline {
    pub inbound: Chain,
    pub outbound: Chain,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_core::RoomcastError;

    #[test]
    fn stages_run_in_order_and_stop_on_error() {
        let mut chain = Chain::default();
        chain.push_back(|_s: SessionId, d: Bytes| -> Result<Bytes> {
            let mut v = d.to_vec();
            v.push(b'a');
            Ok(Bytes::from(v))
        });
        chain.push_back(|_s: SessionId, d: Bytes| -> Result<Bytes> {
            let mut v = d.to_vec();
            v.push(b'b');
            Ok(Bytes::from(v))
        });
        assert_eq!(chain.process(1, Bytes::from_static(b">")).unwrap(), &b">ab"[..]);

        chain.push_back(|_s: SessionId, _d: Bytes| -> Result<Bytes> {
            Err(RoomcastError::BadRequest("rejected".into()))
        });
        assert!(chain.process(1, Bytes::new()).is_err());
    }

    #[test]
    fn empty_chain_passes_through() {
        let chain = Chain::default();
        assert!(chain.is_empty());
        let data = Bytes::from_static(b"payload");
        assert_eq!(chain.process(9, data.clone()).unwrap(), data);
    }
}
