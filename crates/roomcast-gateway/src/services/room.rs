use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use roomcast_core::error::{Result, RoomcastError};
use roomcast_core::protocol::room::{
    AllMembers, JoinResponse, NewUser, UserMessage, ROUTE_MEMBERS, ROUTE_MESSAGE, ROUTE_NEW_USER,
};
use roomcast_core::protocol::text::Envelope;

use crate::config::UidStrategy;
use crate::dispatch::TextService;
use crate::realtime::{Delivery, Group, RequestCtx, Session};

/// Chat room: `room.join` and `room.message`.
pub struct RoomService {
    group: Arc<Group>,
    uid: UidStrategy,
}

impl RoomService {
    pub fn new(group: Arc<Group>, uid: UidStrategy) -> Self {
        Self { group, uid }
    }

    pub fn group(&self) -> &Arc<Group> {
        &self.group
    }

    fn candidate_uid(&self, session: &dyn Session) -> String {
        match self.uid {
            UidStrategy::Session => session.id().to_string(),
            UidStrategy::Generated => Uuid::new_v4().to_string(),
        }
    }

    /// Bind the caller, announce it, and add it to the room.
    ///
    /// A session that is already bound and already a member only gets a
    /// fresh member list and the success response. A closed session is
    /// refused before anything is announced.
    pub fn join(&self, ctx: &RequestCtx) -> Result<()> {
        let session = ctx.session();
        let id = session.id();
        if session.is_closed() {
            return Err(RoomcastError::SessionClosed(id));
        }
        let bound = session.bind(&self.candidate_uid(session.as_ref()))?;
        let uid = Arc::clone(bound.uid());

        if !bound.is_fresh() && self.group.contains(id) {
            tracing::debug!(session = id, %uid, "rejoin, membership unchanged");
            self.push_members(session.as_ref());
            return ctx.respond(&JoinResponse::success());
        }

        self.push_members(session.as_ref());
        let notified = self.group.broadcast(
            ROUTE_NEW_USER,
            &NewUser {
                content: format!("New user: {uid}"),
            },
        )?;
        self.group.add(Arc::clone(session))?;

        let group = Arc::downgrade(&self.group);
        session.on_close(Box::new(move || {
            if let Some(group) = group.upgrade() {
                if group.remove(id) {
                    tracing::info!(session = id, group = %group.name(), members = group.count(), "left room");
                }
            }
        }));

        tracing::info!(
            session = id,
            %uid,
            members = self.group.count(),
            notified = notified.delivered,
            "joined room"
        );
        ctx.respond(&JoinResponse::success())
    }

    /// Broadcast `msg` to every member, sender included. The sender does not
    /// have to be a member.
    pub fn message(&self, ctx: &RequestCtx, msg: &UserMessage) -> Result<Delivery> {
        let delivery = self.group.broadcast(ROUTE_MESSAGE, msg)?;
        tracing::debug!(
            session = ctx.session().id(),
            delivered = delivery.delivered,
            failed = delivery.failed,
            "room message"
        );
        Ok(delivery)
    }

    fn push_members(&self, session: &dyn Session) {
        let members = AllMembers {
            members: self.group.members(),
        };
        let res = serde_json::to_value(&members)
            .map_err(|e| RoomcastError::Internal(format!("members encode failed: {e}")))
            .and_then(|data| session.push(ROUTE_MEMBERS, &data));
        if let Err(e) = res {
            tracing::warn!(session = session.id(), error = %e, "member list not delivered");
        }
    }
}

#[async_trait]
impl TextService for RoomService {
    fn svc(&self) -> &'static str {
        "room"
    }

    async fn handle(&self, ctx: RequestCtx, env: Envelope) -> Result<()> {
        match env.msg_type.to_ascii_lowercase().as_str() {
            "join" => self.join(&ctx),
            "message" => {
                let msg: UserMessage = env.parse_data()?;
                let delivery = self.message(&ctx, &msg)?;
                ctx.respond(&delivery)
            }
            _ => Err(RoomcastError::UnknownRoute(format!(
                "{}.{}",
                env.svc, env.msg_type
            ))),
        }
    }
}
