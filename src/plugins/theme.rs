use tracing::info;

use crate::command::guard::{Arity, Privilege};
use crate::context::PluginContext;
use crate::event::{ChatMessage, HandlerError, HandlerResult};
use crate::plugin::{CommandSpec, Plugin};

const NO_THEME: &str = "There's no theme right now; anything goes!";

/// Keeps track of the room's current theme
#[derive(Debug, Default)]
pub struct Theme {
    theme: Option<String>,
}

impl Theme {
    pub fn current(&self) -> Option<&str> {
        self.theme.as_deref()
    }
}

impl Plugin for Theme {
    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("/theme", "Gets the current theme.").arity(Arity::NoArgument),
            CommandSpec::new("/themeset", "Sets the current theme.")
                .privilege(Privilege::AdminOrModerator),
            CommandSpec::new("/themeclear", "Removes the current theme.")
                .privilege(Privilege::AdminOrModerator)
                .arity(Arity::NoArgument),
        ]
    }

    fn handle_command(
        &mut self,
        command: &str,
        args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> HandlerResult {
        match command {
            "/theme" => match &self.theme {
                Some(theme) => ctx.reply(&format!("The current theme is: \"{}\"", theme), message),
                None => ctx.reply(NO_THEME, message),
            },
            "/themeset" if args.is_empty() => {
                self.theme = None;
                ctx.speak(NO_THEME);
            }
            "/themeset" => {
                info!(theme = %args, by = %message.sender_id, "Theme set");
                ctx.speak(&format!("The theme is now: \"{}\"", args));
                self.theme = Some(args.to_string());
            }
            "/themeclear" => {
                self.theme = None;
                ctx.speak(NO_THEME);
            }
            other => return Err(HandlerError::failed(format!("unexpected command {}", other))),
        }
        Ok(())
    }
}
