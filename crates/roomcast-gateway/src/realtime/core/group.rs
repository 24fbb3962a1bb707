use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use serde::Serialize;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::text::encode_push;

use super::session::{Session, SessionId};

/// Outcome of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct GroupInner {
    members: HashMap<SessionId, Arc<dyn Session>>,
    closed: bool,
}

/// Named set of sessions with broadcast.
///
/// All operations go through one `RwLock`, so adds, removes, counts and
/// snapshots are totally ordered. The lock is only held for map access:
/// broadcast copies the member list, releases the lock, then pushes.
pub struct Group {
    name: String,
    inner: RwLock<GroupInner>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(GroupInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> RwLockReadGuard<'_, GroupInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GroupInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `session` if absent. Returns whether it was newly added.
    pub fn add(&self, session: Arc<dyn Session>) -> Result<bool> {
        let mut inner = self.write();
        if inner.closed {
            return Err(RoomcastError::GroupClosed(self.name.clone()));
        }
        let id = session.id();
        if inner.members.contains_key(&id) {
            return Ok(false);
        }
        inner.members.insert(id, session);
        Ok(true)
    }

    /// Remove a member. Removing a non-member is a no-op.
    pub fn remove(&self, id: SessionId) -> bool {
        self.write().members.remove(&id).is_some()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.read().members.contains_key(&id)
    }

    pub fn contains_uid(&self, uid: &str) -> bool {
        self.read()
            .members
            .values()
            .any(|s| s.uid().as_deref() == Some(uid))
    }

    /// Member identities at call time: the bound uid, else the session id.
    pub fn members(&self) -> Vec<String> {
        self.read()
            .members
            .values()
            .map(|s| match s.uid() {
                Some(uid) => uid.to_string(),
                None => s.id().to_string(),
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.read().members.len()
    }

    /// Push `payload` under `route` to every member. The frame is encoded
    /// once and the same buffer is queued for each member.
    pub fn broadcast<T>(&self, route: &str, payload: &T) -> Result<Delivery>
    where
        T: Serialize + ?Sized,
    {
        let frame = encode(route, payload)?;
        let targets = self.snapshot(|_| true)?;
        Ok(self.fan_out(route, &frame, targets))
    }

    /// Push `payload` to the members whose uid is listed.
    pub fn multicast<T>(&self, route: &str, payload: &T, uids: &[&str]) -> Result<Delivery>
    where
        T: Serialize + ?Sized,
    {
        let frame = encode(route, payload)?;
        let targets = self.snapshot(|s| s.uid().is_some_and(|uid| uids.contains(&&*uid)))?;
        Ok(self.fan_out(route, &frame, targets))
    }

    /// Drop every member. Returns how many were removed.
    pub fn leave_all(&self) -> usize {
        let mut inner = self.write();
        let n = inner.members.len();
        inner.members.clear();
        n
    }

    /// Stop accepting members and drop the current ones.
    pub fn close(&self) {
        let mut inner = self.write();
        inner.closed = true;
        inner.members.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    fn snapshot<F>(&self, keep: F) -> Result<Vec<Arc<dyn Session>>>
    where
        F: Fn(&Arc<dyn Session>) -> bool,
    {
        let inner = self.read();
        if inner.closed {
            return Err(RoomcastError::GroupClosed(self.name.clone()));
        }
        Ok(inner.members.values().filter(|s| keep(*s)).cloned().collect())
    }

    fn fan_out(&self, route: &str, frame: &Bytes, targets: Vec<Arc<dyn Session>>) -> Delivery {
        let mut out = Delivery::default();
        for s in targets {
            match s.push_frame(frame.clone()) {
                Ok(()) => out.delivered += 1,
                Err(e) if e.is_delivery_failure() => {
                    out.failed += 1;
                    tracing::debug!(group = %self.name, session = s.id(), route, error = %e, "member skipped");
                }
                Err(e) => {
                    out.failed += 1;
                    tracing::warn!(group = %self.name, session = s.id(), route, error = %e, "push failed, member skipped");
                }
            }
        }
        out
    }
}

fn encode<T: Serialize + ?Sized>(route: &str, payload: &T) -> Result<Bytes> {
    let data = serde_json::to_value(payload)
        .map_err(|e| RoomcastError::Internal(format!("{route} payload encode failed: {e}")))?;
    encode_push(route, &data)
}
