use std::collections::HashMap;
use tracing::debug;

use crate::context::{BotContext, PluginContext};
use crate::plugin::Plugin;

use super::events::{EventKind, RoomEvent};
use super::handler::{HandlerError, HandlerResult};

/// Handle returned by `register`, used to drop exactly that one listener later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

pub type ListenerFn =
    Box<dyn FnMut(&mut dyn Plugin, &RoomEvent, &mut PluginContext<'_>) -> HandlerResult>;

/// Bind a plugin method as an event listener
pub fn listener<P: Plugin>(
    callback: fn(&mut P, &RoomEvent, &mut PluginContext<'_>) -> HandlerResult,
) -> ListenerFn {
    Box::new(
        move |plugin: &mut dyn Plugin, event: &RoomEvent, ctx: &mut PluginContext<'_>| {
            match plugin.as_any_mut().downcast_mut::<P>() {
                Some(plugin) => callback(plugin, event, ctx),
                None => Err(HandlerError::failed(
                    "listener is bound to a different plugin type",
                )),
            }
        },
    )
}

pub struct Listener {
    pub id: SubscriptionId,
    pub owner: String,
    pub callback: ListenerFn,
}

/// A subscription change requested by a plugin, applied between handlers
pub enum SubscriptionChange {
    Register {
        kind: EventKind,
        listener: Listener,
    },
    Unregister {
        owner: String,
        id: SubscriptionId,
    },
}

impl SubscriptionChange {
    pub fn owner(&self) -> &str {
        match self {
            SubscriptionChange::Register { listener, .. } => &listener.owner,
            SubscriptionChange::Unregister { owner, .. } => owner,
        }
    }
}

/// Plugin listeners per event kind, in registration order
#[derive(Default)]
pub struct ListenerTable {
    by_kind: HashMap<EventKind, Vec<Listener>>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, change: SubscriptionChange) {
        match change {
            SubscriptionChange::Register { kind, listener } => {
                debug!(owner = %listener.owner, event = ?kind, id = listener.id.0, "Listener registered");
                self.by_kind.entry(kind).or_default().push(listener);
            }
            SubscriptionChange::Unregister { owner, id } => {
                for listeners in self.by_kind.values_mut() {
                    listeners.retain(|l| !(l.id == id && l.owner == owner));
                }
                debug!(owner = %owner, id = id.0, "Listener unregistered");
            }
        }
    }

    /// Apply every change queued on the context since the last call
    pub fn apply_pending(&mut self, ctx: &mut BotContext) {
        for change in ctx.take_subscription_changes() {
            self.apply(change);
        }
    }

    /// Drop every listener a plugin owns, returning how many went
    pub fn remove_owner(&mut self, owner: &str) -> usize {
        let mut removed = 0;
        for listeners in self.by_kind.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.owner != owner);
            removed += before - listeners.len();
        }
        removed
    }

    pub fn listeners_mut(&mut self, kind: EventKind) -> Option<&mut Vec<Listener>> {
        self.by_kind.get_mut(&kind)
    }

    pub fn count_for(&self, owner: &str) -> usize {
        self.by_kind
            .values()
            .flatten()
            .filter(|l| l.owner == owner)
            .count()
    }

    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
