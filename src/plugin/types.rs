use std::any::Any;

use crate::command::guard::{Arity, Guard, Privilege};
use crate::context::PluginContext;
use crate::event::{ChatMessage, HandlerResult};

/// A command a plugin asks to have bound in the command table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub token: String,
    /// Checked in order before the handler runs
    pub guards: Vec<Guard>,
    pub help: String,
}

impl CommandSpec {
    pub fn new(token: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            guards: Vec::new(),
            help: help.into(),
        }
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn privilege(self, privilege: Privilege) -> Self {
        self.guard(Guard::Privilege(privilege))
    }

    pub fn arity(self, arity: Arity) -> Self {
        self.guard(Guard::Arity(arity))
    }
}

/// Lets listeners get back to the concrete plugin type they were bound to
pub trait AsAny: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of pluggable bot behavior
///
/// Plugins that declare no commands are listener-only: they subscribe to
/// events from `on_load` and never touch the command table.
pub trait Plugin: AsAny {
    /// Commands to bind while this plugin is loaded
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    /// Called once after the plugin is instantiated, before its commands go live
    fn on_load(&mut self, _ctx: &mut PluginContext<'_>) -> HandlerResult {
        Ok(())
    }

    /// Called right before the plugin is dropped
    fn on_unload(&mut self, _ctx: &mut PluginContext<'_>) {}

    /// Run one of this plugin's commands; guards have already passed
    fn handle_command(
        &mut self,
        _command: &str,
        _args: &str,
        _message: &ChatMessage,
        _ctx: &mut PluginContext<'_>,
    ) -> HandlerResult {
        Ok(())
    }
}
