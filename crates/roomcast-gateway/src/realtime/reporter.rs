//! Periodic room/traffic report.
//!
//! Read-only: each tick samples the group size, live sessions and traffic
//! counters and logs them. Slow ticks are delayed, never bunched up.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use crate::app_state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub at: DateTime<Utc>,
    pub group: String,
    pub members: usize,
    pub sessions: usize,
    pub inbound_bytes: u64,
    pub outbound_bytes: u64,
}

impl Report {
    pub fn sample(app: &AppState) -> Self {
        let traffic = app.traffic().snapshot();
        Self {
            at: Utc::now(),
            group: app.group().name().to_string(),
            members: app.group().count(),
            sessions: app.sessions().len(),
            inbound_bytes: traffic.inbound_bytes,
            outbound_bytes: traffic.outbound_bytes,
        }
    }

    pub fn emit(&self) {
        tracing::info!(
            at = %self.at.to_rfc3339(),
            group = %self.group,
            members = self.members,
            sessions = self.sessions,
            inbound_bytes = self.inbound_bytes,
            outbound_bytes = self.outbound_bytes,
            "room report"
        );
    }
}

/// Handle to the running reporter task.
pub struct Reporter {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Reporter {
    /// Start reporting every `every`. The first report comes after one full
    /// interval.
    pub fn spawn(app: AppState, every: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + every, every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = tick.tick() => Report::sample(&app).emit(),
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("reporter stopped");
        });
        Self { stop, task }
    }

    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "reporter task failed");
        }
    }
}
