use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::text::Envelope;

use crate::realtime::RequestCtx;

/// A named service. Handler names inside a service are matched
/// case-insensitively by the service itself.
#[async_trait]
pub trait TextService: Send + Sync {
    fn svc(&self) -> &'static str;
    async fn handle(&self, ctx: RequestCtx, env: Envelope) -> Result<()>;
}

/// Registry and dispatcher for text services, keyed by lowercase name.
#[derive(Default)]
pub struct Dispatcher {
    text: DashMap<String, Arc<dyn TextService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            text: DashMap::new(),
        }
    }

    pub fn register_text(&self, svc: Arc<dyn TextService>) {
        let name = svc.svc().to_ascii_lowercase();
        if self.text.insert(name.clone(), svc).is_some() {
            tracing::warn!(svc = %name, "service registered twice, previous replaced");
        }
    }

    pub fn registered_text_svcs(&self) -> Vec<String> {
        self.text.iter().map(|e| e.key().clone()).collect()
    }

    pub async fn dispatch_text(&self, ctx: RequestCtx, env: Envelope) -> Result<()> {
        let svc = env.svc.to_ascii_lowercase();
        let handler = self
            .text
            .get(&svc)
            .ok_or_else(|| RoomcastError::UnknownRoute(env.svc.clone()))?
            .value()
            .clone();
        handler.handle(ctx, env).await
    }
}
