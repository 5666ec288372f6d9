use tracing::info;

use crate::command::guard::{Arity, Privilege};
use crate::context::PluginContext;
use crate::event::{listener, ChatMessage, EventKind, HandlerError, HandlerResult, RoomEvent};
use crate::plugin::{CommandSpec, Plugin};
use crate::room::RoomState;

/// What the bot should do about its seat at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    StepUp,
    StepDown,
    Stay,
}

/// Leave when nobody is listening or every slot is taken
pub fn should_step_down(room: &RoomState) -> bool {
    room.is_dj() && (room.listener_ids.len() <= 1 || room.dj_ids.len() >= room.max_djs)
}

/// Join only a table that has listeners and is nearly empty
pub fn should_step_up(room: &RoomState) -> bool {
    !room.is_dj()
        && room.listener_ids.len() > 1
        && room.dj_ids.len() < 2.min(room.max_djs.saturating_sub(1))
}

pub fn rotation_decision(room: &RoomState) -> Rotation {
    if should_step_down(room) {
        Rotation::StepDown
    } else if should_step_up(room) {
        Rotation::StepUp
    } else {
        Rotation::Stay
    }
}

/// Fills in as a DJ when the table is thin and steps down when it fills up
///
/// Roster events are authoritative: commands only ask the transport, and
/// the resulting `add_dj`/`rem_dj` notification is what changes the state.
#[derive(Debug, Default)]
pub struct Dj {
    /// A step-down came due mid-song; leave when it ends
    end_song_step_down: bool,
    auto_skip: bool,
}

impl Dj {
    fn dj_update(&mut self, event: &RoomEvent, ctx: &mut PluginContext<'_>) -> HandlerResult {
        let bot_id = ctx.room().bot_id.clone();
        if event.users().iter().any(|user| user.user_id == bot_id) {
            if event.kind() == EventKind::RemDj {
                self.auto_skip = false;
            }
            return Ok(());
        }

        match rotation_decision(ctx.room()) {
            Rotation::StepDown if ctx.room().is_playing() => self.end_song_step_down = true,
            Rotation::StepDown => {
                info!("Leaving the table");
                ctx.transport().rem_dj();
            }
            Rotation::StepUp => {
                info!("Stepping up to DJ");
                ctx.transport().add_dj();
            }
            Rotation::Stay => {}
        }
        Ok(())
    }

    fn end_song(&mut self, _event: &RoomEvent, ctx: &mut PluginContext<'_>) -> HandlerResult {
        if self.end_song_step_down {
            if should_step_down(ctx.room()) {
                info!("Delayed leaving the table");
                ctx.transport().rem_dj();
            }
            self.end_song_step_down = false;
        }
        Ok(())
    }

    fn new_song(&mut self, _event: &RoomEvent, ctx: &mut PluginContext<'_>) -> HandlerResult {
        let room = ctx.room();
        if room.is_playing() && self.auto_skip && room.dj_ids.len() > 1 {
            ctx.transport().skip();
        }
        Ok(())
    }

    fn play(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) {
        let room = ctx.room();
        if room.is_dj() {
            ctx.reply("I am already DJing.", message);
        } else if room.dj_ids.len() < room.max_djs {
            ctx.transport().add_dj();
        } else {
            ctx.reply("I can not do that right now.", message);
        }
    }

    fn stop(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) {
        if ctx.room().is_dj() {
            ctx.transport().rem_dj();
        } else {
            ctx.reply("I am not currently DJing.", message);
        }
    }

    fn skip_song(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) {
        if ctx.room().is_playing() {
            ctx.transport().skip();
            ctx.reply(":poop: I was just getting into it.", message);
        } else {
            ctx.reply("I am not currently playing.", message);
        }
    }

    fn toggle_auto_skip(&mut self, message: &ChatMessage, ctx: &mut PluginContext<'_>) {
        self.auto_skip = !self.auto_skip;
        if self.auto_skip {
            ctx.reply("I'll just keep this seat warm for you.", message);
            if ctx.room().is_playing() && ctx.room().dj_ids.len() > 1 {
                ctx.transport().skip();
            }
        } else {
            ctx.reply("I'm back baby!", message);
        }
    }
}

impl Plugin for Dj {
    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("/autoskip", "Toggle whether the bot should play anything.")
                .arity(Arity::NoArgument),
            CommandSpec::new("/djdown", "Have the bot step down as a dj.")
                .privilege(Privilege::AdminOrModerator)
                .arity(Arity::NoArgument),
            CommandSpec::new("/djup", "Attempt to have the bot dj.")
                .privilege(Privilege::AdminOrModerator)
                .arity(Arity::NoArgument),
            CommandSpec::new("/skip", "Ask the bot to skip the current song.")
                .arity(Arity::NoArgument),
        ]
    }

    fn on_load(&mut self, ctx: &mut PluginContext<'_>) -> HandlerResult {
        for kind in [
            EventKind::AddDj,
            EventKind::Deregistered,
            EventKind::Registered,
            EventKind::RemDj,
        ] {
            ctx.register(kind, listener(Dj::dj_update));
        }
        ctx.register(EventKind::EndSong, listener(Dj::end_song));
        ctx.register(EventKind::NewSong, listener(Dj::new_song));
        Ok(())
    }

    fn handle_command(
        &mut self,
        command: &str,
        _args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> HandlerResult {
        match command {
            "/autoskip" => self.toggle_auto_skip(message, ctx),
            "/djdown" => self.stop(message, ctx),
            "/djup" => self.play(message, ctx),
            "/skip" => self.skip_song(message, ctx),
            other => return Err(HandlerError::failed(format!("unexpected command {}", other))),
        }
        Ok(())
    }
}
