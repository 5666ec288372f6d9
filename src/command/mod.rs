// Command routing: guards, the command table and the reserved built-ins

pub mod builtins;
pub mod guard;
pub mod router;

pub use builtins::Builtin;
pub use guard::{evaluate, Access, Arity, Guard, GuardOutcome, Privilege};
pub use router::{parse_command, CommandEntry, CommandOwner, CommandTable, COMMAND_SIGIL};
