use strum_macros::EnumIter;
use tracing::info;

use crate::event::{Bot, ChatMessage};
use crate::plugin::RegistryError;
use crate::shared::{pretty_elapsed, VERSION};

use super::guard::{Arity, Guard, Privilege};

/// Commands owned by the core; their tokens are reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Builtin {
    About,
    Commands,
    Help,
    Join,
    Leave,
    PluginLoad,
    PluginReload,
    PluginUnload,
    Plugins,
    Uptime,
}

impl Builtin {
    pub fn token(self) -> &'static str {
        match self {
            Builtin::About => "/about",
            Builtin::Commands => "/commands",
            Builtin::Help => "/help",
            Builtin::Join => "/join",
            Builtin::Leave => "/leave",
            Builtin::PluginLoad => "/pgload",
            Builtin::PluginReload => "/pgreload",
            Builtin::PluginUnload => "/pgunload",
            Builtin::Plugins => "/plugins",
            Builtin::Uptime => "/uptime",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Builtin::About => "Display information about this bot.",
            Builtin::Commands => "List the available commands.",
            Builtin::Help => {
                "With no arguments, display this message. Otherwise, display the \
                 help for the given command. Type /commands to see the list of commands."
            }
            Builtin::Join => {
                "Join the room by room_id. With no arguments, join the room \
                 specified in lazysusan.toml."
            }
            Builtin::Leave => "Leave the current room and remain connected to the chat server.",
            Builtin::PluginLoad => "Load the specified plugin.",
            Builtin::PluginReload => "Reload the specified plugin.",
            Builtin::PluginUnload => "Unload the specified plugin.",
            Builtin::Plugins => "Display the list of loaded plugins.",
            Builtin::Uptime => "Display how long since LazySusan was started.",
        }
    }

    pub fn guards(self) -> Vec<Guard> {
        let plugin_admin = vec![
            Guard::Privilege(Privilege::AdminOrModerator),
            Guard::Arity(Arity::SingleToken),
        ];
        match self {
            Builtin::About | Builtin::Commands | Builtin::Uptime => {
                vec![Guard::Arity(Arity::NoArgument)]
            }
            Builtin::Help => Vec::new(),
            Builtin::Join => vec![Guard::Privilege(Privilege::Admin)],
            Builtin::Leave => vec![
                Guard::Privilege(Privilege::Admin),
                Guard::Arity(Arity::NoArgument),
            ],
            Builtin::PluginLoad | Builtin::PluginReload | Builtin::PluginUnload => plugin_admin,
            Builtin::Plugins => vec![
                Guard::Privilege(Privilege::AdminOrModerator),
                Guard::Arity(Arity::NoArgument),
            ],
        }
    }
}

impl Bot {
    /// Run a built-in command whose guards have already passed
    pub(crate) fn run_builtin(&mut self, builtin: Builtin, args: &str, message: &ChatMessage) {
        match builtin {
            Builtin::About => {
                let reply = format!(
                    "I am powered by LazySusan version {}. https://github.com/bboe/LazySusan",
                    VERSION
                );
                self.ctx.reply(&reply, message);
            }
            Builtin::Commands => self.list_commands(message),
            Builtin::Help => self.help(args, message),
            Builtin::Join => {
                if args.contains(' ') {
                    return;
                }
                let room_id = if args.is_empty() {
                    self.ctx.config().room_id.clone()
                } else {
                    args.to_string()
                };
                if self.ctx.room().room_id.as_deref() == Some(room_id.as_str()) {
                    self.ctx.reply("I am already in that room.", message);
                } else {
                    self.ctx.connect(&room_id, true);
                }
            }
            Builtin::Leave => {
                info!(room_id = ?self.ctx.room().room_id, "Leaving room");
                self.ctx.set_pending_leave(&message.sender_id);
                self.ctx.transport().room_deregister();
            }
            Builtin::PluginLoad => {
                let reply = match self.load_plugin(args, true) {
                    Ok(()) => format!("Plugin `{}` loaded.", args),
                    Err(RegistryError::AlreadyLoaded(_)) => {
                        format!("Plugin `{}` is already loaded.", args)
                    }
                    Err(_) => format!("Plugin `{}` could not be loaded.", args),
                };
                self.ctx.reply(&reply, message);
            }
            Builtin::PluginReload => {
                let reply = match self.reload_plugin(args) {
                    Ok(()) => format!("Plugin `{}` reloaded.", args),
                    Err(RegistryError::NotLoaded(_)) => format!("Plugin `{}` is not loaded.", args),
                    Err(_) => format!("Plugin `{}` could not be reloaded.", args),
                };
                self.ctx.reply(&reply, message);
            }
            Builtin::PluginUnload => {
                let reply = match self.unload_plugin(args) {
                    Ok(()) => format!("Plugin `{}` unloaded.", args),
                    Err(_) => format!("Plugin `{}` is not loaded.", args),
                };
                self.ctx.reply(&reply, message);
            }
            Builtin::Plugins => {
                let reply = format!(
                    "Loaded plugins: {}",
                    self.registry.loaded_names().join(", ")
                );
                self.ctx.reply(&reply, message);
            }
            Builtin::Uptime => {
                let reply = format!(
                    "LazySusan was started {}",
                    pretty_elapsed(self.ctx.started_at(), chrono::Utc::now())
                );
                self.ctx.reply(&reply, message);
            }
        }
    }

    /// Public commands go to the channel, each privileged tier privately to its holders
    fn list_commands(&self, message: &ChatMessage) {
        let mut public = Vec::new();
        let mut moderator = Vec::new();
        let mut privileged = Vec::new();
        let mut admin = Vec::new();
        for entry in self.registry.commands().entries() {
            let bucket = match entry.privilege() {
                Privilege::None => &mut public,
                Privilege::Moderator => &mut moderator,
                Privilege::AdminOrModerator => &mut privileged,
                Privilege::Admin => &mut admin,
            };
            bucket.push(entry.token.as_str());
        }

        public.sort_unstable();
        self.ctx
            .reply(&format!("Available commands: {}", public.join(", ")), message);

        let user_id = message.sender_id.as_str();
        let is_admin = self.ctx.is_admin(user_id);
        let is_moderator = self.ctx.is_moderator(user_id);
        for (label, mut tokens, allowed) in [
            ("Moderator", moderator, is_moderator),
            ("Privileged", privileged, is_admin || is_moderator),
            ("Admin", admin, is_admin),
        ] {
            if tokens.is_empty() || !allowed {
                continue;
            }
            tokens.sort_unstable();
            self.ctx
                .pm(&format!("{} commands: {}", label, tokens.join(", ")), user_id);
        }
    }

    fn help(&self, args: &str, message: &ChatMessage) {
        let reply = if args.is_empty() {
            Builtin::Help.help().to_string()
        } else if args.contains(' ') {
            return;
        } else {
            match self.registry.commands().get(args) {
                Some(entry) => {
                    // Do not advertise commands the caller could not run
                    if !entry
                        .privilege()
                        .allows(&message.sender_id, &self.ctx.access())
                    {
                        return;
                    }
                    entry.help.clone()
                }
                None => format!("`{}` is not a valid command.", args),
            }
        };
        self.ctx.reply(&reply, message);
    }
}
