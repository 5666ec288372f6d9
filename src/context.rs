use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::command::guard::Access;
use crate::config::BotConfig;
use crate::event::{
    isolate, ChatMessage, EventKind, HandlerResult, Listener, ListenerFn, MessageKind, RoomEvent,
    SubscriptionChange, SubscriptionId,
};
use crate::room::RoomState;
use crate::scheduler::Scheduler;
use crate::shared::BotError;
use crate::transport::Transport;

pub type ScheduledCallback = Box<dyn FnOnce(&mut BotContext) -> HandlerResult>;

/// Everything a handler may touch besides plugins themselves
///
/// Handlers receive this explicitly instead of reaching into global state:
/// replies, the transport, deferred events, listener subscriptions and a
/// read-only view of the room.
pub struct BotContext {
    config: BotConfig,
    room: RoomState,
    transport: Arc<dyn Transport>,
    scheduler: Scheduler<ScheduledCallback>,
    started_at: DateTime<Utc>,
    next_subscription_id: u64,
    owned_subscriptions: HashMap<String, HashSet<SubscriptionId>>,
    pending_changes: Vec<SubscriptionChange>,
    /// Room requested by the last join, until the service confirms it
    joining_room: Option<String>,
    /// Who asked us to leave, told once the service answers
    pending_leave: Option<String>,
}

impl BotContext {
    pub fn new(config: BotConfig, transport: Arc<dyn Transport>) -> Self {
        let room = RoomState::new(config.user_id.clone());
        Self {
            config,
            room,
            transport,
            scheduler: Scheduler::new(),
            started_at: Utc::now(),
            next_subscription_id: 0,
            owned_subscriptions: HashMap::new(),
            pending_changes: Vec::new(),
            joining_room: None,
            pending_leave: None,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    pub(crate) fn room_mut(&mut self) -> &mut RoomState {
        &mut self.room
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn access(&self) -> Access<'_> {
        Access::new(&self.config.admin_ids, &self.room.moderator_ids)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.config.is_admin(user_id)
    }

    pub fn is_moderator(&self, user_id: &str) -> bool {
        self.room.is_moderator(user_id)
    }

    pub fn speak(&self, message: &str) {
        self.transport.speak(message);
    }

    pub fn pm(&self, message: &str, user_id: &str) {
        self.transport.pm(message, user_id);
    }

    /// Answer a chat message on the channel it arrived on
    pub fn reply(&self, message: &str, to: &ChatMessage) {
        match to.kind {
            MessageKind::Broadcast => self.transport.speak(message),
            MessageKind::PrivateMessage => self.transport.pm(message, &to.sender_id),
        }
    }

    /// Answer the event a listener received; only message events can be answered
    pub fn reply_to_event(&self, message: &str, event: &RoomEvent) -> Result<(), BotError> {
        let chat = event
            .as_chat_message()
            .ok_or(BotError::UnroutableReply { event: event.name() })?;
        self.reply(message, &chat);
        Ok(())
    }

    /// Run `callback` at the first cooperative checkpoint after `min_delay`
    pub fn schedule<F>(&mut self, min_delay: Duration, callback: F)
    where
        F: FnOnce(&mut BotContext) -> HandlerResult + 'static,
    {
        self.scheduler.schedule(min_delay, Box::new(callback));
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// Run every scheduled callback due before `now`, each in isolation
    pub fn run_delayed_events(&mut self, now: Instant) -> usize {
        let mut count = 0;
        while let Some(callback) = self.scheduler.pop_due(now) {
            isolate("scheduled event", || callback(self));
            count += 1;
        }
        count
    }

    /// Ask the service to put us in `room_id`
    ///
    /// With `when_connected` false this only acts while the bot is roomless,
    /// which is what the delayed rejoin attempts want.
    pub fn connect(&mut self, room_id: &str, when_connected: bool) {
        let current = self.room.room_id.as_deref();
        if current == Some(room_id) || (current.is_some() && !when_connected) {
            return;
        }
        info!(room_id = %room_id, "Joining room");
        self.joining_room = Some(room_id.to_string());
        self.transport.room_register(room_id);
    }

    pub(crate) fn take_joining_room(&mut self) -> Option<String> {
        self.joining_room.take()
    }

    pub(crate) fn set_pending_leave(&mut self, user_id: &str) {
        self.pending_leave = Some(user_id.to_string());
    }

    pub(crate) fn take_pending_leave(&mut self) -> Option<String> {
        self.pending_leave.take()
    }

    pub(crate) fn register_listener(
        &mut self,
        owner: &str,
        kind: EventKind,
        callback: ListenerFn,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;
        // Every unrecognized command lands on this one kind, so it cannot be told apart
        if kind == EventKind::Unknown {
            warn!(plugin = %owner, "Ignoring subscription to unrecognized events");
            return id;
        }
        self.owned_subscriptions
            .entry(owner.to_string())
            .or_default()
            .insert(id);
        self.pending_changes.push(SubscriptionChange::Register {
            kind,
            listener: Listener {
                id,
                owner: owner.to_string(),
                callback,
            },
        });
        id
    }

    pub(crate) fn unregister_listener(&mut self, owner: &str, id: SubscriptionId) -> bool {
        let removed = self
            .owned_subscriptions
            .get_mut(owner)
            .is_some_and(|ids| ids.remove(&id));
        if removed {
            self.pending_changes.push(SubscriptionChange::Unregister {
                owner: owner.to_string(),
                id,
            });
        }
        removed
    }

    pub fn subscription_count(&self, owner: &str) -> usize {
        self.owned_subscriptions.get(owner).map_or(0, HashSet::len)
    }

    /// Forget every subscription of `owner`, including ones not yet applied
    pub(crate) fn release_owner(&mut self, owner: &str) {
        self.owned_subscriptions.remove(owner);
        self.pending_changes.retain(|change| change.owner() != owner);
    }

    pub(crate) fn take_subscription_changes(&mut self) -> Vec<SubscriptionChange> {
        std::mem::take(&mut self.pending_changes)
    }
}

/// The bot context as seen by one particular plugin
///
/// Derefs to `BotContext`; adds subscriptions that are owned by, and
/// released together with, the plugin.
pub struct PluginContext<'a> {
    owner: &'a str,
    ctx: &'a mut BotContext,
}

impl<'a> PluginContext<'a> {
    pub fn new(owner: &'a str, ctx: &'a mut BotContext) -> Self {
        Self { owner, ctx }
    }

    /// Registration name of the plugin this context belongs to
    pub fn owner(&self) -> &str {
        self.owner
    }

    /// Subscribe to an event; takes effect once the current handler returns
    pub fn register(&mut self, kind: EventKind, callback: ListenerFn) -> SubscriptionId {
        self.ctx.register_listener(self.owner, kind, callback)
    }

    /// Drop one subscription; false if it is not ours or already gone
    pub fn unregister(&mut self, id: SubscriptionId) -> bool {
        self.ctx.unregister_listener(self.owner, id)
    }
}

impl Deref for PluginContext<'_> {
    type Target = BotContext;

    fn deref(&self) -> &BotContext {
        self.ctx
    }
}

impl DerefMut for PluginContext<'_> {
    fn deref_mut(&mut self) -> &mut BotContext {
        self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::HandlerError;
    use crate::plugin::Plugin;
    use crate::transport::TransportAction;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport(Mutex<Vec<TransportAction>>);

    impl Transport for RecordingTransport {
        fn send(&self, action: TransportAction) {
            self.0.lock().unwrap().push(action);
        }
    }

    fn context() -> (BotContext, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::default());
        let config = BotConfig::from_map(HashMap::from([
            ("user_id".to_string(), "bot".to_string()),
            ("auth_id".to_string(), "auth".to_string()),
            ("room_id".to_string(), "home".to_string()),
            ("admin_ids".to_string(), "boss".to_string()),
        ]))
        .unwrap();
        (BotContext::new(config, transport.clone()), transport)
    }

    #[test]
    fn test_reply_routes_by_message_kind() {
        let (ctx, transport) = context();

        ctx.reply("hi all", &ChatMessage::broadcast("u1", "alice", "/x"));
        ctx.reply("hi you", &ChatMessage::private("u2", "/x"));

        let sent = transport.0.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                TransportAction::Speak {
                    message: "hi all".to_string()
                },
                TransportAction::Pm {
                    message: "hi you".to_string(),
                    user_id: "u2".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_reply_to_non_message_event_fails() {
        let (ctx, transport) = context();
        let err = ctx.reply_to_event("nope", &RoomEvent::Ready).unwrap_err();

        assert!(matches!(err, BotError::UnroutableReply { event: "ready" }));
        assert!(transport.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failing_scheduled_callback_does_not_stop_drain() {
        let (mut ctx, transport) = context();
        ctx.schedule(Duration::ZERO, |_| Err(HandlerError::failed("first fails")));
        ctx.schedule(Duration::ZERO, |_| panic!("second panics"));
        ctx.schedule(Duration::ZERO, |ctx| {
            ctx.speak("third runs");
            Ok(())
        });

        let ran = ctx.run_delayed_events(Instant::now() + Duration::from_millis(10));

        assert_eq!(ran, 3);
        assert_eq!(ctx.pending_events(), 0);
        assert_eq!(
            transport.0.lock().unwrap().clone(),
            vec![TransportAction::Speak {
                message: "third runs".to_string()
            }]
        );
    }

    #[test]
    fn test_connect_respects_current_room() {
        let (mut ctx, transport) = context();

        ctx.connect("home", false);
        ctx.room_mut().room_id = Some("home".to_string());
        ctx.connect("home", true);
        ctx.connect("elsewhere", false);
        ctx.connect("elsewhere", true);

        let sent = transport.0.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                TransportAction::RoomRegister {
                    room_id: "home".to_string()
                },
                TransportAction::RoomRegister {
                    room_id: "elsewhere".to_string()
                },
            ]
        );
    }

    struct Dummy;
    impl Plugin for Dummy {}

    #[test]
    fn test_subscriptions_are_tracked_per_owner() {
        let (mut ctx, _) = context();
        let mut plugin_ctx = PluginContext::new("dummy.Dummy", &mut ctx);

        let first = plugin_ctx.register(
            EventKind::AddDj,
            crate::event::listener::<Dummy>(|_, _, _| Ok(())),
        );
        let second = plugin_ctx.register(
            EventKind::RemDj,
            crate::event::listener::<Dummy>(|_, _, _| Ok(())),
        );
        assert_ne!(first, second);
        assert!(plugin_ctx.unregister(first));
        assert!(!plugin_ctx.unregister(first));
        assert_eq!(ctx.subscription_count("dummy.Dummy"), 1);

        // Register, register, unregister
        assert_eq!(ctx.take_subscription_changes().len(), 3);

        ctx.release_owner("dummy.Dummy");
        assert_eq!(ctx.subscription_count("dummy.Dummy"), 0);
    }

    #[test]
    fn test_unrecognized_events_cannot_be_subscribed() {
        let (mut ctx, _) = context();
        let mut plugin_ctx = PluginContext::new("dummy.Dummy", &mut ctx);

        let id = plugin_ctx.register(
            EventKind::Unknown,
            crate::event::listener::<Dummy>(|_, _, _| Ok(())),
        );

        assert!(!plugin_ctx.unregister(id));
        assert_eq!(ctx.subscription_count("dummy.Dummy"), 0);
        assert!(ctx.take_subscription_changes().is_empty());
    }
}
