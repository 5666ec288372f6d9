// Declarative plugins read from the plugin directory
//
// Each `<module>.toml` file holds one table per class, each with canned-reply
// commands:
//
// ```toml
// [Greeter.commands."/hello"]
// reply = "Hello {sender}!"
// help = "Say hello."
// privilege = "moderator"
// arity = "no-argument"
// ```
//
// The class above loads as `greeter.Greeter` (or just `greeter`) when the
// file is named `greeter.toml`.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::command::guard::{Arity, Privilege};
use crate::context::PluginContext;
use crate::event::{ChatMessage, HandlerResult};

use super::catalog::PluginFactory;
use super::types::{CommandSpec, Plugin};

pub const MANIFEST_EXTENSION: &str = "toml";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Command `{token}` has an unknown {field} `{value}`")]
    InvalidGuard {
        token: String,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Deserialize)]
struct ClassManifest {
    #[serde(default)]
    commands: BTreeMap<String, CommandManifest>,
}

#[derive(Debug, Deserialize)]
struct CommandManifest {
    reply: String,
    #[serde(default)]
    help: String,
    privilege: Option<String>,
    arity: Option<String>,
}

#[derive(Debug, Clone)]
struct ManifestCommand {
    spec: CommandSpec,
    reply: String,
}

/// A plugin whose commands answer with a fixed template
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    commands: Arc<Vec<ManifestCommand>>,
}

impl ManifestPlugin {
    fn render(template: &str, args: &str, message: &ChatMessage) -> String {
        let sender = message
            .sender_name
            .as_deref()
            .unwrap_or(&message.sender_id);
        template.replace("{args}", args).replace("{sender}", sender)
    }
}

impl Plugin for ManifestPlugin {
    fn commands(&self) -> Vec<CommandSpec> {
        self.commands.iter().map(|c| c.spec.clone()).collect()
    }

    fn handle_command(
        &mut self,
        command: &str,
        args: &str,
        message: &ChatMessage,
        ctx: &mut PluginContext<'_>,
    ) -> HandlerResult {
        if let Some(found) = self.commands.iter().find(|c| c.spec.token == command) {
            ctx.reply(&Self::render(&found.reply, args, message), message);
        }
        Ok(())
    }
}

fn build_command(token: String, manifest: CommandManifest) -> Result<ManifestCommand, ManifestError> {
    let mut spec = CommandSpec::new(token.clone(), manifest.help);
    if let Some(value) = manifest.privilege {
        let privilege: Privilege = value.parse().map_err(|_| ManifestError::InvalidGuard {
            token: token.clone(),
            field: "privilege",
            value: value.clone(),
        })?;
        spec = spec.privilege(privilege);
    }
    if let Some(value) = manifest.arity {
        let arity: Arity = value.parse().map_err(|_| ManifestError::InvalidGuard {
            token: token.clone(),
            field: "arity",
            value: value.clone(),
        })?;
        spec = spec.arity(arity);
    }
    Ok(ManifestCommand {
        spec,
        reply: manifest.reply,
    })
}

/// Parse one manifest into its classes, keyed by class name
pub fn parse_manifest(text: &str, origin: &str) -> Result<HashMap<String, ManifestPlugin>, ManifestError> {
    let classes: BTreeMap<String, ClassManifest> =
        toml::from_str(text).map_err(|e| ManifestError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;

    classes
        .into_iter()
        .map(|(class, manifest)| -> Result<_, ManifestError> {
            let commands = manifest
                .commands
                .into_iter()
                .map(|(token, command)| build_command(token, command))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((
                class,
                ManifestPlugin {
                    commands: Arc::new(commands),
                },
            ))
        })
        .collect()
}

fn load_manifest(path: &Path) -> Result<HashMap<String, ManifestPlugin>, ManifestError> {
    let origin = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: origin.clone(),
        source,
    })?;
    parse_manifest(&text, &origin)
}

/// Read every manifest in `dir` into factories keyed by `module.Class`
///
/// Broken manifests are logged and skipped.
pub fn scan_plugin_dir(dir: &Path) -> HashMap<String, PluginFactory> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Cannot read plugin directory");
            return HashMap::new();
        }
    };

    let mut found: HashMap<String, PluginFactory> = HashMap::new();
    for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
        if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
            continue;
        }
        let Some(module) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match load_manifest(&path) {
            Ok(classes) => {
                for (class, plugin) in classes {
                    let name = format!("{}.{}", module, class);
                    debug!(plugin = %name, "Found manifest plugin");
                    found.insert(
                        name,
                        Arc::new(move || Box::new(plugin.clone()) as Box<dyn Plugin>),
                    );
                }
            }
            Err(e) => warn!(error = %e, "Skipping plugin manifest"),
        }
    }
    found
}
