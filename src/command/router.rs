use std::collections::{HashMap, HashSet};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::plugin::{CommandSpec, RegistryError};

use super::builtins::Builtin;
use super::guard::{required_privilege, Guard, Privilege};

/// Every command token starts with this
pub const COMMAND_SIGIL: char = '/';

/// Split chat text into a command token and its normalized argument string
///
/// Arguments are rejoined with single spaces, so `"/cmd   a   b"` yields
/// `("/cmd", "a b")`. Returns `None` for empty text or text that does not
/// start with the command sigil.
pub fn parse_command(text: &str) -> Option<(&str, String)> {
    let mut parts = text.split_whitespace();
    let command = parts.next()?;
    if !command.starts_with(COMMAND_SIGIL) {
        return None;
    }
    Some((command, parts.collect::<Vec<_>>().join(" ")))
}

/// Who a command-table entry belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOwner {
    Builtin(Builtin),
    Plugin(String),
}

#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub token: String,
    pub owner: CommandOwner,
    pub guards: Vec<Guard>,
    pub help: String,
}

impl CommandEntry {
    pub fn privilege(&self) -> Privilege {
        required_privilege(&self.guards)
    }
}

/// The flat mapping from command token to handler
pub struct CommandTable {
    entries: HashMap<String, CommandEntry>,
}

impl CommandTable {
    /// A table holding only the reserved built-in commands
    pub fn with_builtins() -> Self {
        let entries = Builtin::iter()
            .map(|builtin| {
                let entry = CommandEntry {
                    token: builtin.token().to_string(),
                    owner: CommandOwner::Builtin(builtin),
                    guards: builtin.guards(),
                    help: builtin.help().to_string(),
                };
                (entry.token.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, token: &str) -> Option<&CommandEntry> {
        self.entries.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    /// Sorted list of every token currently bound
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.entries.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    /// Verify that every declared command could be bound for `plugin`
    pub fn check_available(&self, plugin: &str, specs: &[CommandSpec]) -> Result<(), RegistryError> {
        let mut declared = HashSet::new();
        for spec in specs {
            if !spec.token.starts_with(COMMAND_SIGIL)
                || spec.token.len() == COMMAND_SIGIL.len_utf8()
                || spec.token.contains(char::is_whitespace)
            {
                return Err(RegistryError::InvalidToken {
                    plugin: plugin.to_string(),
                    token: spec.token.clone(),
                });
            }
            if let Some(existing) = self.entries.get(&spec.token) {
                return Err(match &existing.owner {
                    CommandOwner::Builtin(_) => RegistryError::Reserved {
                        token: spec.token.clone(),
                        plugin: plugin.to_string(),
                    },
                    CommandOwner::Plugin(owner) => RegistryError::Conflict {
                        token: spec.token.clone(),
                        plugin: plugin.to_string(),
                        owner: owner.clone(),
                    },
                });
            }
            if !declared.insert(spec.token.as_str()) {
                return Err(RegistryError::Conflict {
                    token: spec.token.clone(),
                    plugin: plugin.to_string(),
                    owner: plugin.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Bind all of a plugin's commands or none of them
    ///
    /// Returns the tokens that were added, for symmetric removal later.
    pub fn register_plugin(
        &mut self,
        plugin: &str,
        specs: Vec<CommandSpec>,
    ) -> Result<Vec<String>, RegistryError> {
        self.check_available(plugin, &specs)?;

        let mut added = Vec::with_capacity(specs.len());
        for spec in specs {
            debug!(plugin = %plugin, command = %spec.token, "Binding command");
            added.push(spec.token.clone());
            self.entries.insert(
                spec.token.clone(),
                CommandEntry {
                    token: spec.token,
                    owner: CommandOwner::Plugin(plugin.to_string()),
                    guards: spec.guards,
                    help: spec.help,
                },
            );
        }
        Ok(added)
    }

    /// Remove the given tokens, skipping any not owned by `plugin`
    pub fn remove_plugin_tokens(&mut self, plugin: &str, tokens: &[String]) -> usize {
        let mut removed = 0;
        for token in tokens {
            let owned = matches!(
                self.entries.get(token),
                Some(CommandEntry { owner: CommandOwner::Plugin(owner), .. }) if owner == plugin
            );
            if owned {
                self.entries.remove(token);
                removed += 1;
            }
        }
        removed
    }
}
