use std::collections::HashSet;
use strum_macros::{Display, EnumString};

/// Who may run a command
///
/// These are predicates rather than a ladder: an admin is not implicitly a
/// moderator, which is why `AdminOrModerator` exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Privilege {
    None,
    Moderator,
    Admin,
    AdminOrModerator,
}

/// What argument text a command accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Arity {
    FreeForm,
    NoArgument,
    #[strum(serialize = "single-token-argument", serialize = "single-token")]
    SingleToken,
}

/// The two sources of privilege: static admin ids and live moderator ids
#[derive(Debug, Clone, Copy)]
pub struct Access<'a> {
    pub admin_ids: &'a HashSet<String>,
    pub moderator_ids: &'a HashSet<String>,
}

impl<'a> Access<'a> {
    pub fn new(admin_ids: &'a HashSet<String>, moderator_ids: &'a HashSet<String>) -> Self {
        Self {
            admin_ids,
            moderator_ids,
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.contains(user_id)
    }

    pub fn is_moderator(&self, user_id: &str) -> bool {
        self.moderator_ids.contains(user_id)
    }
}

impl Privilege {
    pub fn allows(self, user_id: &str, access: &Access<'_>) -> bool {
        match self {
            Privilege::None => true,
            Privilege::Moderator => access.is_moderator(user_id),
            Privilege::Admin => access.is_admin(user_id),
            Privilege::AdminOrModerator => {
                access.is_admin(user_id) || access.is_moderator(user_id)
            }
        }
    }

    /// Private reply sent to a caller who fails this check
    pub fn denial_message(self) -> &'static str {
        match self {
            Privilege::None => "",
            Privilege::Moderator => "You must be a moderator to execute that command.",
            Privilege::Admin => "You must be an admin to execute that command.",
            Privilege::AdminOrModerator => {
                "You must be either an admin or a moderator to execute that command."
            }
        }
    }
}

impl Arity {
    pub fn allows(self, args: &str) -> bool {
        match self {
            Arity::FreeForm => true,
            Arity::NoArgument => args.is_empty(),
            Arity::SingleToken => !args.is_empty() && !args.contains(char::is_whitespace),
        }
    }
}

/// One link of a command's guard chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Privilege(Privilege),
    Arity(Arity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Pass,
    /// Dropped without a reply (wrong arguments)
    Reject,
    /// Caller lacks the privilege; they get told privately
    Deny(Privilege),
}

/// Run the chain in order, stopping at the first guard that fails
pub fn evaluate(guards: &[Guard], user_id: &str, args: &str, access: &Access<'_>) -> GuardOutcome {
    for guard in guards {
        match guard {
            Guard::Privilege(privilege) if !privilege.allows(user_id, access) => {
                return GuardOutcome::Deny(*privilege);
            }
            Guard::Arity(arity) if !arity.allows(args) => return GuardOutcome::Reject,
            _ => {}
        }
    }
    GuardOutcome::Pass
}

/// The privilege tier a guard chain demands
pub fn required_privilege(guards: &[Guard]) -> Privilege {
    guards
        .iter()
        .find_map(|guard| match guard {
            Guard::Privilege(privilege) => Some(*privilege),
            Guard::Arity(_) => None,
        })
        .unwrap_or(Privilege::None)
}
