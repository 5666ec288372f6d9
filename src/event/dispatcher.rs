use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::command::guard::{evaluate, GuardOutcome};
use crate::command::router::{parse_command, CommandOwner};
use crate::config::BotConfig;
use crate::context::{BotContext, PluginContext};
use crate::plugin::{PluginCatalog, PluginRegistry, RegistryError};
use crate::room::RoomState;
use crate::transport::{EventSource, Transport};

use super::events::{ChatMessage, RoomEvent, RoomInfo, User};
use super::handler::isolate;
use super::listeners::ListenerTable;

/// Service error number for a join refused because the bot is banned
const ERRNO_BANNED: i64 = 3;
const BANNED_RETRY_DELAY: Duration = Duration::from_secs(180);
const BOOTED_REJOIN_DELAY: Duration = Duration::from_secs(30);
const LEAVE_REJOIN_DELAY: Duration = Duration::from_secs(60);

/// The bot core: the only place transport events enter the system
///
/// Every event is handled to completion before the next one is pulled:
/// - built-in room-state bookkeeping runs first
/// - chat messages are routed to a built-in or plugin command
/// - plugin listeners subscribed to the event kind are notified
/// - finally the scheduler is drained
///
/// Each handler invocation is isolated, so one failing handler never stops
/// the ones after it or the loop itself.
pub struct Bot {
    pub(crate) ctx: BotContext,
    pub(crate) registry: PluginRegistry,
    pub(crate) listeners: ListenerTable,
}

impl Bot {
    pub fn new(config: BotConfig, transport: Arc<dyn Transport>, catalog: PluginCatalog) -> Self {
        Self {
            ctx: BotContext::new(config, transport),
            registry: PluginRegistry::new(catalog),
            listeners: ListenerTable::new(),
        }
    }

    pub fn context(&self) -> &BotContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut BotContext {
        &mut self.ctx
    }

    pub fn room(&self) -> &RoomState {
        self.ctx.room()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn listeners(&self) -> &ListenerTable {
        &self.listeners
    }

    /// Load the plugins named in the configuration, in order
    ///
    /// Failures are logged and skipped; returns how many loaded.
    pub fn load_startup_plugins(&mut self) -> usize {
        let names = self.ctx.config().plugins.clone();
        let loaded = names
            .iter()
            .filter(|name| self.load_plugin(name, false).is_ok())
            .count();
        info!(loaded, requested = names.len(), "Startup plugins loaded");
        loaded
    }

    /// Join the configured room
    pub fn connect(&mut self) {
        let room_id = self.ctx.config().room_id.clone();
        self.ctx.connect(&room_id, true);
    }

    pub fn load_plugin(&mut self, name: &str, refresh: bool) -> Result<(), RegistryError> {
        let result = self
            .registry
            .load(name, &mut self.ctx, &mut self.listeners, refresh);
        if let Err(e) = &result {
            warn!(plugin = %name, error = %e, "Not loading plugin");
        }
        result
    }

    pub fn unload_plugin(&mut self, name: &str) -> Result<(), RegistryError> {
        self.registry.unload(name, &mut self.ctx, &mut self.listeners)
    }

    pub fn reload_plugin(&mut self, name: &str) -> Result<(), RegistryError> {
        let result = self
            .registry
            .reload(name, &mut self.ctx, &mut self.listeners);
        if let Err(e) = &result {
            warn!(plugin = %name, error = %e, "Plugin reload failed");
        }
        result
    }

    /// Pull events from `source` until it closes
    pub async fn run<S>(&mut self, source: &mut S)
    where
        S: EventSource + ?Sized,
    {
        info!("Starting event loop");
        while let Some(event) = source.next_event().await {
            self.handle_event(event);
        }
        info!("Event source closed, stopping event loop");
    }

    pub fn handle_event(&mut self, event: RoomEvent) {
        self.handle_event_at(event, Instant::now());
    }

    /// Handle one event, draining the scheduler as of `now` afterwards
    pub fn handle_event_at(&mut self, event: RoomEvent, now: Instant) {
        debug!(event = event.name(), "Dispatching event");

        self.apply_builtin(&event);
        if let Some(message) = self.routable_message(&event) {
            self.process_message(&message);
        }
        self.notify_listeners(&event);

        let ran = self.ctx.run_delayed_events(now);
        if ran > 0 {
            debug!(ran, pending = self.ctx.pending_events(), "Ran delayed events");
        }
    }

    /// Route one chat message to the command it names, if any
    ///
    /// Text that is not a bound command is ignored without a reply; the bot
    /// shares the channel with ordinary chat.
    pub fn process_message(&mut self, message: &ChatMessage) {
        let Some((command, args)) = parse_command(&message.text) else {
            return;
        };
        let Some(entry) = self.registry.commands().get(command) else {
            return;
        };
        let owner = entry.owner.clone();

        match evaluate(&entry.guards, &message.sender_id, &args, &self.ctx.access()) {
            GuardOutcome::Pass => {}
            GuardOutcome::Reject => {
                debug!(command = %command, args = %args, "Arguments rejected");
                return;
            }
            GuardOutcome::Deny(privilege) => {
                info!(
                    command = %command,
                    user_id = %message.sender_id,
                    required = %privilege,
                    "Permission denied"
                );
                self.ctx.pm(privilege.denial_message(), &message.sender_id);
                return;
            }
        }

        debug!(command = %command, user_id = %message.sender_id, "Running command");
        match owner {
            CommandOwner::Builtin(builtin) => {
                isolate(command, || {
                    self.run_builtin(builtin, &args, message);
                    Ok(())
                });
            }
            CommandOwner::Plugin(name) => {
                let Some(plugin) = self.registry.plugin_mut(&name) else {
                    error!(plugin = %name, command = %command, "Command bound to a plugin that is not loaded");
                    return;
                };
                let mut plugin_ctx = PluginContext::new(&name, &mut self.ctx);
                isolate(&name, || {
                    plugin.handle_command(command, &args, message, &mut plugin_ctx)
                });
            }
        }
        self.listeners.apply_pending(&mut self.ctx);
    }

    /// Chat messages to route
    ///
    /// Broadcasts are dropped until the bot knows its own name, and after
    /// that whenever they are the bot's own.
    fn routable_message(&self, event: &RoomEvent) -> Option<ChatMessage> {
        match event {
            RoomEvent::Speak { name, .. }
                if self
                    .ctx
                    .room()
                    .username
                    .as_deref()
                    .map_or(true, |own| own == name.as_str()) =>
            {
                None
            }
            RoomEvent::Speak { .. } | RoomEvent::PrivateMessage { .. } => {
                event.as_chat_message()
            }
            _ => None,
        }
    }

    fn notify_listeners(&mut self, event: &RoomEvent) {
        let Some(listeners) = self.listeners.listeners_mut(event.kind()) else {
            return;
        };
        for listener in listeners.iter_mut() {
            let Some(plugin) = self.registry.plugin_mut(&listener.owner) else {
                warn!(plugin = %listener.owner, "Listener outlived its plugin");
                continue;
            };
            let mut plugin_ctx = PluginContext::new(&listener.owner, &mut self.ctx);
            isolate(&listener.owner, || {
                (listener.callback)(plugin, event, &mut plugin_ctx)
            });
        }
        self.listeners.apply_pending(&mut self.ctx);
    }

    /// Room-state bookkeeping wired in at construction
    fn apply_builtin(&mut self, event: &RoomEvent) {
        match event {
            RoomEvent::Registered { users } => self.ctx.room_mut().add_listeners(users),
            RoomEvent::Deregistered { users } => self.ctx.room_mut().remove_listeners(users),
            RoomEvent::AddDj { users } => self.ctx.room_mut().add_djs(users),
            RoomEvent::RemDj { users } => self.ctx.room_mut().remove_djs(users),
            RoomEvent::NewModerator { user_id } => self.ctx.room_mut().add_moderator(user_id),
            RoomEvent::RemModerator { user_id } => self.ctx.room_mut().remove_moderator(user_id),
            RoomEvent::RoomChanged {
                success,
                errno,
                room,
                users,
            } => self.room_changed(*success, *errno, room.as_ref(), users),
            RoomEvent::BootedUser { user_id } if *user_id == self.ctx.room().bot_id => {
                warn!("Booted from the room, rejoining in 30 seconds");
                self.ctx.room_mut().clear_room();
                self.schedule_rejoin(BOOTED_REJOIN_DELAY);
            }
            RoomEvent::Ready => self.ctx.transport().user_info(),
            RoomEvent::UserInfo { user_id, name } => {
                let is_self = user_id
                    .as_deref()
                    .map_or(true, |id| id == self.ctx.room().bot_id);
                if is_self && self.ctx.room().username.is_none() {
                    info!(username = %name, "Identity confirmed");
                    self.ctx.room_mut().username = Some(name.clone());
                }
            }
            RoomEvent::RoomDeregistered { success } => self.leave_completed(*success),
            RoomEvent::NewSong { current_dj } => {
                self.ctx.room_mut().current_dj_id = current_dj.clone();
            }
            _ => {}
        }
    }

    fn room_changed(
        &mut self,
        success: bool,
        errno: Option<i64>,
        room: Option<&RoomInfo>,
        users: &[User],
    ) {
        let requested = self.ctx.take_joining_room();
        if !success {
            if errno == Some(ERRNO_BANNED) {
                warn!("Banned from that room, retrying in 3 minutes");
                self.schedule_rejoin(BANNED_RETRY_DELAY);
                return;
            }
            error!(errno = ?errno, "Error changing rooms");
            self.ctx.room_mut().clear_room();
            self.connect();
            return;
        }

        let state = self.ctx.room_mut();
        state.clear_room();
        if let Some(room) = room {
            state.apply_room_snapshot(room, users);
        } else {
            state.add_listeners(users);
        }
        if state.room_id.is_none() {
            state.room_id = requested;
        }
        info!(
            room_id = ?state.room_id,
            listeners = state.listener_ids.len(),
            djs = state.dj_ids.len(),
            "Joined room"
        );
    }

    fn leave_completed(&mut self, success: bool) {
        let requester = self.ctx.take_pending_leave();
        if success {
            info!("Left the room");
            self.ctx.room_mut().clear_room();
            self.schedule_rejoin(LEAVE_REJOIN_DELAY);
            if let Some(user_id) = requester {
                self.ctx.pm(
                    "I have left the room. If I remain roomless after ~1 minute, \
                     I will rejoin the default room.",
                    &user_id,
                );
            }
        } else {
            warn!("Leaving the room failed");
            if let Some(user_id) = requester {
                self.ctx.pm("Leaving the room failed.", &user_id);
            }
        }
    }

    /// Rejoin the configured room after `delay`, unless we are in a room by then
    fn schedule_rejoin(&mut self, delay: Duration) {
        let room_id = self.ctx.config().room_id.clone();
        self.ctx.schedule(delay, move |ctx| {
            ctx.connect(&room_id, false);
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RoomMetadata;
    use crate::plugins::builtin_catalog;
    use crate::transport::{ChannelTransport, TransportAction};
    use std::collections::HashMap;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn bot() -> (Bot, UnboundedReceiver<TransportAction>) {
        let config = BotConfig::from_map(HashMap::from([
            ("user_id".to_string(), "bot".to_string()),
            ("auth_id".to_string(), "auth".to_string()),
            ("room_id".to_string(), "home".to_string()),
            ("admin_ids".to_string(), "boss".to_string()),
        ]))
        .unwrap();
        let (transport, receiver) = ChannelTransport::new();
        (Bot::new(config, Arc::new(transport), builtin_catalog()), receiver)
    }

    fn drain(receiver: &mut UnboundedReceiver<TransportAction>) -> Vec<TransportAction> {
        let mut actions = Vec::new();
        while let Ok(action) = receiver.try_recv() {
            actions.push(action);
        }
        actions
    }

    fn joined(room_id: &str) -> RoomEvent {
        RoomEvent::RoomChanged {
            success: true,
            errno: None,
            room: Some(RoomInfo {
                room_id: Some(room_id.to_string()),
                metadata: RoomMetadata {
                    djs: vec!["d1".to_string()],
                    max_djs: 5,
                    moderator_id: vec!["m1".to_string()],
                    current_dj: Some("d1".to_string()),
                },
            }),
            users: vec![User::new("d1"), User::new("m1"), User::new("bot")],
        }
    }

    #[test]
    fn test_room_changed_replaces_state() {
        let (mut bot, _rx) = bot();
        bot.handle_event(RoomEvent::Registered {
            users: vec![User::new("stale")],
        });
        bot.handle_event(joined("home"));

        let room = bot.room();
        assert_eq!(room.room_id.as_deref(), Some("home"));
        assert_eq!(room.listener_ids.len(), 3);
        assert!(!room.listener_ids.contains("stale"));
        assert!(room.is_moderator("m1"));
        assert_eq!(room.max_djs, 5);
    }

    #[test]
    fn test_ready_then_user_info_sets_username_once() {
        let (mut bot, mut rx) = bot();
        bot.handle_event(RoomEvent::Ready);
        assert_eq!(drain(&mut rx), vec![TransportAction::UserInfo]);

        bot.handle_event(RoomEvent::UserInfo {
            user_id: Some("bot".to_string()),
            name: "Susan".to_string(),
        });
        bot.handle_event(RoomEvent::UserInfo {
            user_id: Some("bot".to_string()),
            name: "Renamed".to_string(),
        });
        assert_eq!(bot.room().username.as_deref(), Some("Susan"));
    }

    #[test]
    fn test_own_speech_is_ignored() {
        let (mut bot, mut rx) = bot();
        bot.context_mut().room_mut().username = Some("Susan".to_string());

        bot.handle_event(RoomEvent::Speak {
            user_id: "bot".to_string(),
            name: "Susan".to_string(),
            text: "/about".to_string(),
        });
        assert!(drain(&mut rx).is_empty());

        bot.handle_event(RoomEvent::Speak {
            user_id: "u1".to_string(),
            name: "alice".to_string(),
            text: "/about".to_string(),
        });
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_speech_is_ignored_until_identity_is_known() {
        let (mut bot, mut rx) = bot();
        bot.load_plugin("simple.Echo", false).unwrap();
        bot.handle_event(RoomEvent::Ready);
        assert_eq!(drain(&mut rx), vec![TransportAction::UserInfo]);

        bot.handle_event(RoomEvent::Speak {
            user_id: "bot".to_string(),
            name: "Susan".to_string(),
            text: "/echo /echo loop".to_string(),
        });
        assert!(drain(&mut rx).is_empty());

        // Private messages never come from the bot itself
        bot.handle_event(RoomEvent::PrivateMessage {
            sender_id: "u1".to_string(),
            text: "/echo hi".to_string(),
        });
        assert_eq!(drain(&mut rx).len(), 1);

        bot.handle_event(RoomEvent::UserInfo {
            user_id: Some("bot".to_string()),
            name: "Susan".to_string(),
        });
        bot.handle_event(RoomEvent::Speak {
            user_id: "u1".to_string(),
            name: "alice".to_string(),
            text: "/echo hello".to_string(),
        });
        assert_eq!(
            drain(&mut rx),
            vec![TransportAction::Speak {
                message: "hello".to_string()
            }]
        );
    }

    #[test]
    fn test_booted_bot_rejoins_after_delay() {
        let (mut bot, mut rx) = bot();
        bot.handle_event(joined("home"));
        let start = Instant::now();

        bot.handle_event_at(
            RoomEvent::BootedUser {
                user_id: "bot".to_string(),
            },
            start,
        );
        assert!(bot.room().room_id.is_none());
        assert!(drain(&mut rx).is_empty());

        bot.handle_event_at(RoomEvent::KeepAlive, start + Duration::from_secs(12));
        assert!(drain(&mut rx).is_empty());

        bot.handle_event_at(RoomEvent::KeepAlive, start + Duration::from_secs(31));
        assert_eq!(
            drain(&mut rx),
            vec![TransportAction::RoomRegister {
                room_id: "home".to_string()
            }]
        );
    }

    #[test]
    fn test_other_user_booted_is_ignored() {
        let (mut bot, _rx) = bot();
        bot.handle_event(joined("home"));
        bot.handle_event(RoomEvent::BootedUser {
            user_id: "d1".to_string(),
        });
        assert_eq!(bot.room().room_id.as_deref(), Some("home"));
        assert_eq!(bot.context().pending_events(), 0);
    }

    #[test]
    fn test_banned_join_retries_later() {
        let (mut bot, mut rx) = bot();
        bot.connect();
        drain(&mut rx);

        bot.handle_event(RoomEvent::RoomChanged {
            success: false,
            errno: Some(ERRNO_BANNED),
            room: None,
            users: Vec::new(),
        });
        assert!(drain(&mut rx).is_empty());
        assert_eq!(bot.context().pending_events(), 1);

        bot.handle_event(RoomEvent::RoomChanged {
            success: false,
            errno: Some(1),
            room: None,
            users: Vec::new(),
        });
        assert_eq!(
            drain(&mut rx),
            vec![TransportAction::RoomRegister {
                room_id: "home".to_string()
            }]
        );
    }

    #[test]
    fn test_leave_completion_tells_requester() {
        let (mut bot, mut rx) = bot();
        bot.handle_event(joined("home"));

        bot.handle_event(RoomEvent::PrivateMessage {
            sender_id: "boss".to_string(),
            text: "/leave".to_string(),
        });
        assert_eq!(drain(&mut rx), vec![TransportAction::RoomDeregister]);

        bot.handle_event(RoomEvent::RoomDeregistered { success: true });
        assert!(bot.room().room_id.is_none());
        assert_eq!(bot.context().pending_events(), 1);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [TransportAction::Pm { user_id, .. }] if user_id == "boss"
        ));
    }

    #[test]
    fn test_keepalive_drains_scheduler() {
        let (mut bot, mut rx) = bot();
        bot.context_mut().schedule(Duration::from_secs(5), |ctx| {
            ctx.speak("tick");
            Ok(())
        });
        let start = Instant::now();

        bot.handle_event_at(RoomEvent::KeepAlive, start + Duration::from_secs(2));
        assert!(drain(&mut rx).is_empty());

        bot.handle_event_at(RoomEvent::KeepAlive, start + Duration::from_millis(5_001));
        bot.handle_event_at(RoomEvent::KeepAlive, start + Duration::from_secs(10));
        assert_eq!(
            drain(&mut rx),
            vec![TransportAction::Speak {
                message: "tick".to_string()
            }]
        );
    }
}
