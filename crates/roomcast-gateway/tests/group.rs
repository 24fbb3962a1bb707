#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde_json::{json, Value};

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::room::UserMessage;
use roomcast_core::protocol::text::{Frame, FrameKind};
use roomcast_gateway::realtime::{BindOutcome, CloseHook, Delivery, Group, Session, SessionId};

use common::{drain, pushes, session};

#[test]
fn add_is_idempotent_and_remove_tolerates_absent() {
    let group = Group::new("room");
    let (a, _ra) = session(1);
    let (b, _rb) = session(2);

    assert!(group.add(a.clone()).unwrap());
    assert!(!group.add(a.clone()).unwrap());
    assert!(group.add(b.clone()).unwrap());
    assert_eq!(group.count(), 2);

    let members = group.members();
    let unique: HashSet<_> = members.iter().collect();
    assert_eq!(members.len(), unique.len());

    assert!(group.remove(1));
    assert!(!group.remove(1));
    assert!(!group.remove(42));
    assert_eq!(group.count(), 1);
    assert!(!group.contains(1));
    assert!(group.contains(2));
}

#[test]
fn members_reports_uid_or_session_id() {
    let group = Group::new("room");
    let (a, _ra) = session(7);
    let (b, _rb) = session(8);
    b.bind("bob").unwrap();
    group.add(a).unwrap();
    group.add(b).unwrap();

    let mut members = group.members();
    members.sort();
    assert_eq!(members, vec!["7".to_string(), "bob".to_string()]);
    assert!(group.contains_uid("bob"));
    assert!(!group.contains_uid("7"));
}

#[test]
fn members_is_a_snapshot() {
    let group = Group::new("room");
    let (a, _ra) = session(1);
    group.add(a).unwrap();
    let before = group.members();

    let (b, _rb) = session(2);
    group.add(b).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(group.members().len(), 2);
}

#[test]
fn broadcast_reaches_every_member_once() {
    let group = Group::new("room");
    let mut rxs = Vec::new();
    for id in 1..=5 {
        let (s, rx) = session(id);
        group.add(s).unwrap();
        rxs.push(rx);
    }

    let msg = UserMessage {
        name: "ann".into(),
        content: "hello".into(),
    };
    let d = group.broadcast("onMessage", &msg).unwrap();
    assert_eq!(d, Delivery { delivered: 5, failed: 0 });

    for rx in rxs.iter_mut() {
        let frames = drain(rx);
        let got = pushes(&frames, "onMessage");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].data["content"], "hello");
    }
}

#[test]
fn broadcast_skips_failed_members() {
    let group = Group::new("room");
    let (a, mut ra) = session(1);
    let (b, rb) = session(2);
    let (c, mut rc) = session(3);
    group.add(a).unwrap();
    group.add(b).unwrap();
    group.add(c).unwrap();

    // b's transport is gone but it has not been removed yet.
    drop(rb);

    let d = group.broadcast("onNewUser", &json!({"content": "New user: 4"})).unwrap();
    assert_eq!(d, Delivery { delivered: 2, failed: 1 });
    assert_eq!(pushes(&drain(&mut ra), "onNewUser").len(), 1);
    assert_eq!(pushes(&drain(&mut rc), "onNewUser").len(), 1);
    assert_eq!(group.count(), 3);
}

#[test]
fn multicast_targets_listed_uids() {
    let group = Group::new("room");
    let (a, mut ra) = session(1);
    let (b, mut rb) = session(2);
    a.bind("ann").unwrap();
    b.bind("bob").unwrap();
    group.add(a).unwrap();
    group.add(b).unwrap();

    let d = group.multicast("onMessage", &json!({"content": "psst"}), &["bob"]).unwrap();
    assert_eq!(d.delivered, 1);
    assert!(drain(&mut ra).is_empty());
    assert_eq!(pushes(&drain(&mut rb), "onMessage").len(), 1);
}

#[test]
fn closed_group_rejects_adds_and_broadcasts() {
    let group = Group::new("room");
    let (a, _ra) = session(1);
    group.add(a.clone()).unwrap();
    assert_eq!(group.leave_all(), 1);
    assert_eq!(group.count(), 0);

    group.add(a.clone()).unwrap();
    group.close();
    assert!(group.is_closed());
    assert_eq!(group.count(), 0);

    let err = group.add(a).unwrap_err();
    assert_eq!(err.client_code().as_str(), "GROUP_CLOSED");
    let err = group.broadcast("onMessage", &json!({})).unwrap_err();
    assert_eq!(err.client_code().as_str(), "GROUP_CLOSED");
    assert!(!group.remove(1));
}

#[test]
fn concurrent_add_remove_keeps_count_consistent() {
    let group = Arc::new(Group::new("room"));
    let (sessions, _rxs): (Vec<_>, Vec<_>) = (0..400).map(session).unzip();

    std::thread::scope(|scope| {
        for chunk in sessions.chunks(50) {
            let group = Arc::clone(&group);
            scope.spawn(move || {
                for s in chunk {
                    group.add(s.clone()).unwrap();
                    group.add(s.clone()).unwrap();
                    let _ = group.broadcast("onMessage", &json!({"n": s.id()}));
                    if s.id() % 2 == 0 {
                        group.remove(s.id());
                        group.remove(s.id());
                    }
                }
            });
        }
    });

    assert_eq!(group.count(), 200);
    let members = group.members();
    let unique: HashSet<_> = members.iter().collect();
    assert_eq!(unique.len(), 200);
    assert!(sessions
        .iter()
        .all(|s| group.contains(s.id()) == (s.id() % 2 == 1)));
}

/// Records queued frames; optionally fails every push with `fail_with`.
struct Recorder {
    id: SessionId,
    frames: Mutex<Vec<Bytes>>,
    fail_with: Option<fn(SessionId) -> RoomcastError>,
}

impl Recorder {
    fn new(id: SessionId) -> Arc<Self> {
        Arc::new(Self {
            id,
            frames: Mutex::new(Vec::new()),
            fail_with: None,
        })
    }

    fn failing(id: SessionId, fail_with: fn(SessionId) -> RoomcastError) -> Arc<Self> {
        Arc::new(Self {
            id,
            frames: Mutex::new(Vec::new()),
            fail_with: Some(fail_with),
        })
    }

    fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().unwrap().clone()
    }
}

impl Session for Recorder {
    fn id(&self) -> SessionId {
        self.id
    }

    fn uid(&self) -> Option<Arc<str>> {
        None
    }

    fn bind(&self, uid: &str) -> Result<BindOutcome> {
        Ok(BindOutcome::Bound(Arc::from(uid)))
    }

    fn push(&self, _route: &str, _data: &Value) -> Result<()> {
        panic!("group pushes go through push_frame");
    }

    fn push_frame(&self, frame: Bytes) -> Result<()> {
        if let Some(fail) = self.fail_with {
            return Err(fail(self.id));
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }

    fn respond(&self, _seq: u64, _data: &Value) -> Result<()> {
        Ok(())
    }

    fn on_close(&self, _hook: CloseHook) {}

    fn is_closed(&self) -> bool {
        false
    }
}

#[test]
fn broadcast_encodes_the_frame_once() {
    let group = Group::new("room");
    let recorders: Vec<_> = (1..=3).map(Recorder::new).collect();
    for r in &recorders {
        group.add(r.clone()).unwrap();
    }

    let d = group.broadcast("onMessage", &json!({"content": "shared"})).unwrap();
    assert_eq!(d.delivered, 3);

    let frames: Vec<Bytes> = recorders.iter().flat_map(|r| r.frames()).collect();
    assert_eq!(frames.len(), 3);
    let first = frames[0].as_ptr();
    assert!(frames.iter().all(|f| f.as_ptr() == first));

    let frame = Frame::decode(&frames[0]).unwrap();
    assert_eq!(frame.kind, FrameKind::Push);
    assert_eq!(frame.route.as_deref(), Some("onMessage"));
    assert_eq!(frame.data["content"], "shared");
}

#[test]
fn every_push_error_is_counted_as_failed() {
    let group = Group::new("room");
    let ok = Recorder::new(1);
    group.add(ok.clone()).unwrap();
    group.add(Recorder::failing(2, RoomcastError::Backpressure)).unwrap();
    group.add(Recorder::failing(3, RoomcastError::SessionClosed)).unwrap();
    group
        .add(Recorder::failing(4, |_| RoomcastError::Internal("broken".into())))
        .unwrap();

    let d = group.broadcast("onNewUser", &json!({"content": "New user: 5"})).unwrap();
    assert_eq!(d, Delivery { delivered: 1, failed: 3 });
    assert_eq!(ok.frames().len(), 1);
    assert_eq!(group.count(), 4);
}
