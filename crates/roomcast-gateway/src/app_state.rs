//! Shared application state for the roomcast gateway.
//!
//! Everything mutable (session registry, room group, traffic counters) is
//! owned here and handed to transports and services by handle. Built once at
//! startup; the room service is registered and the traffic stages attached in
//! `AppState::new`.

use std::sync::Arc;

use roomcast_core::error::{Result, RoomcastError};

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::pipeline::{Pipeline, TrafficCounter};
use crate::realtime::{Group, SessionRegistry};
use crate::services::RoomService;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    sessions: Arc<SessionRegistry>,
    group: Arc<Group>,
    traffic: Arc<TrafficCounter>,
    pipeline: Pipeline,
    dispatcher: Dispatcher,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        cfg.validate()?;

        let sessions = Arc::new(SessionRegistry::new());
        let group = Arc::new(Group::new(cfg.room.name.clone()));
        let traffic = Arc::new(TrafficCounter::new());

        let mut pipeline = Pipeline::new();
        traffic.attach(&mut pipeline);

        let dispatcher = Dispatcher::new();
        dispatcher.register_text(Arc::new(RoomService::new(Arc::clone(&group), cfg.room.uid)));

        let svcs = dispatcher.registered_text_svcs();
        if !svcs.iter().any(|s| s == "room") {
            return Err(RoomcastError::Internal("room service not registered".into()));
        }
        tracing::debug!(?svcs, group = %group.name(), "services registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                sessions,
                group,
                traffic,
                pipeline,
                dispatcher,
            }),
        })
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.inner.sessions
    }

    pub fn group(&self) -> &Arc<Group> {
        &self.inner.group
    }

    pub fn traffic(&self) -> &Arc<TrafficCounter> {
        &self.inner.traffic
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Close the room and every live session.
    pub fn shutdown(&self) {
        let closed = self.inner.sessions.close_all();
        self.inner.group.close();
        tracing::info!(sessions = closed, group = %self.inner.group.name(), "state released");
    }
}
