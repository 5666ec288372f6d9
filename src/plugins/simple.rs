use crate::context::PluginContext;
use crate::event::{ChatMessage, HandlerResult};
use crate::plugin::{CommandSpec, Plugin};

/// Lets users speak as the bot
#[derive(Debug, Default)]
pub struct Echo;

impl Plugin for Echo {
    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandSpec::new("/echo", "Repeat everything after /echo.")]
    }

    fn handle_command(
        &mut self,
        _command: &str,
        args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> HandlerResult {
        ctx.reply(args, message);
        Ok(())
    }
}
