use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::command::router::CommandTable;
use crate::context::{BotContext, PluginContext};
use crate::event::{guarded, isolate, ListenerTable};

use super::catalog::PluginCatalog;
use super::types::Plugin;

/// Why a plugin could not be loaded, unloaded or reloaded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Cannot find plugin `{0}`.")]
    NotFound(String),

    #[error("Plugin `{0}` is already loaded.")]
    AlreadyLoaded(String),

    #[error("Plugin `{0}` is not loaded.")]
    NotLoaded(String),

    #[error("`{plugin}` declares the invalid command token `{token}`.")]
    InvalidToken { plugin: String, token: String },

    /// The token is already bound by another plugin
    #[error("`{plugin}` conflicts with `{owner}` for command `{token}`.")]
    Conflict {
        token: String,
        plugin: String,
        owner: String,
    },

    /// The token belongs to a built-in command
    #[error("`{plugin}` cannot use the reserved command `{token}`.")]
    Reserved { token: String, plugin: String },

    #[error("Plugin `{plugin}` failed to initialize: {reason}")]
    Init { plugin: String, reason: String },
}

impl RegistryError {
    /// Both sub-reasons of a registration conflict
    pub fn is_registration_conflict(&self) -> bool {
        matches!(
            self,
            RegistryError::Conflict { .. } | RegistryError::Reserved { .. }
        )
    }
}

struct LoadedPlugin {
    plugin: Box<dyn Plugin>,
    /// Exactly the tokens this load added, removed again on unload
    tokens: Vec<String>,
}

/// Loaded plugins and the command table they contribute to
pub struct PluginRegistry {
    catalog: PluginCatalog,
    commands: CommandTable,
    plugins: HashMap<String, LoadedPlugin>,
}

impl PluginRegistry {
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            commands: CommandTable::with_builtins(),
            plugins: HashMap::new(),
        }
    }

    /// Resolve, instantiate and register a plugin
    ///
    /// Commands are checked before `on_load` runs, so a conflicting plugin
    /// never gets to subscribe listeners or touch the room.
    pub fn load(
        &mut self,
        name: &str,
        ctx: &mut BotContext,
        listeners: &mut ListenerTable,
        refresh: bool,
    ) -> Result<(), RegistryError> {
        if self.plugins.contains_key(name) {
            return Err(RegistryError::AlreadyLoaded(name.to_string()));
        }

        let factory = self.catalog.resolve(name, refresh)?;
        let mut plugin = factory();
        let specs = plugin.commands();
        self.commands.check_available(name, &specs)?;

        let init = {
            let mut plugin_ctx = PluginContext::new(name, ctx);
            guarded(|| plugin.on_load(&mut plugin_ctx))
        };
        if let Err(e) = init {
            ctx.release_owner(name);
            return Err(RegistryError::Init {
                plugin: name.to_string(),
                reason: e.to_string(),
            });
        }

        let tokens = match self.commands.register_plugin(name, specs) {
            Ok(tokens) => tokens,
            Err(e) => {
                ctx.release_owner(name);
                return Err(e);
            }
        };
        listeners.apply_pending(ctx);

        info!(
            plugin = %name,
            commands = tokens.len(),
            listeners = listeners.count_for(name),
            "Loaded plugin"
        );
        self.plugins
            .insert(name.to_string(), LoadedPlugin { plugin, tokens });
        Ok(())
    }

    /// Drop a plugin along with its commands and listeners
    pub fn unload(
        &mut self,
        name: &str,
        ctx: &mut BotContext,
        listeners: &mut ListenerTable,
    ) -> Result<(), RegistryError> {
        let Some(mut loaded) = self.plugins.remove(name) else {
            return Err(RegistryError::NotLoaded(name.to_string()));
        };

        {
            let mut plugin_ctx = PluginContext::new(name, ctx);
            isolate("on_unload", || {
                loaded.plugin.on_unload(&mut plugin_ctx);
                Ok(())
            });
        }

        // Anything the plugin queued while unloading dies with it
        ctx.release_owner(name);
        listeners.apply_pending(ctx);
        let dropped_listeners = listeners.remove_owner(name);
        let dropped_commands = self.commands.remove_plugin_tokens(name, &loaded.tokens);
        if dropped_commands != loaded.tokens.len() {
            warn!(
                plugin = %name,
                expected = loaded.tokens.len(),
                removed = dropped_commands,
                "Plugin commands were already gone"
            );
        }

        info!(
            plugin = %name,
            commands = dropped_commands,
            listeners = dropped_listeners,
            "Unloaded plugin"
        );
        Ok(())
    }

    /// Unload then load a freshly resolved provider
    ///
    /// If the load half fails the plugin stays unloaded.
    pub fn reload(
        &mut self,
        name: &str,
        ctx: &mut BotContext,
        listeners: &mut ListenerTable,
    ) -> Result<(), RegistryError> {
        self.unload(name, ctx, listeners)?;
        self.load(name, ctx, listeners, true)
    }

    pub fn plugin_mut(&mut self, name: &str) -> Option<&mut dyn Plugin> {
        self.plugins
            .get_mut(name)
            .map(|loaded| loaded.plugin.as_mut())
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Tokens contributed by a loaded plugin
    pub fn tokens_of(&self, name: &str) -> Option<&[String]> {
        self.plugins.get(name).map(|loaded| loaded.tokens.as_slice())
    }

    /// Names of every loaded plugin, sorted
    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }
}
