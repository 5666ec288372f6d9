use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::manifest::scan_plugin_dir;
use super::registry::RegistryError;
use super::types::Plugin;

/// Builds a fresh plugin instance
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Title-case a module name the way plugin class names are written
///
/// `"theme"` becomes `"Theme"`, `"bot_dj"` becomes `"Bot_Dj"`.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for c in name.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Expand a plugin name to its `module.Class` form
///
/// A bare module name refers to the class named after it.
pub fn qualified_name(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{}.{}", name, title_case(name))
    }
}

/// Resolves plugin names to factories
///
/// Providers found on the plugin search path shadow the built-in namespace.
pub struct PluginCatalog {
    plugin_dir: Option<PathBuf>,
    /// Manifests found in `plugin_dir`, replaced wholesale on every rescan
    manifests: HashMap<String, PluginFactory>,
    search_path: HashMap<String, PluginFactory>,
    builtin: HashMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self {
            plugin_dir: None,
            manifests: HashMap::new(),
            search_path: HashMap::new(),
            builtin: HashMap::new(),
        }
    }

    /// Add a provider to the built-in namespace under its `module.Class` name
    pub fn register_builtin(&mut self, name: &str, factory: PluginFactory) {
        self.builtin.insert(qualified_name(name), factory);
    }

    /// Add a provider to the search path, ahead of the built-ins
    pub fn register_external(&mut self, name: &str, factory: PluginFactory) {
        self.search_path.insert(qualified_name(name), factory);
    }

    /// Use `dir` as the plugin search path and scan it now
    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if dir.is_dir() {
            self.plugin_dir = Some(dir);
            self.rescan();
        } else {
            warn!(dir = %dir.display(), "Plugin directory is not a directory");
        }
        self
    }

    pub fn plugin_dir(&self) -> Option<&Path> {
        self.plugin_dir.as_deref()
    }

    /// Re-read the plugin search path so edited manifests take effect
    pub fn rescan(&mut self) {
        let Some(dir) = &self.plugin_dir else {
            return;
        };
        self.manifests = scan_plugin_dir(dir);
        info!(dir = %dir.display(), count = self.manifests.len(), "Scanned plugin directory");
    }

    /// Find the provider for `name`, looking at the search path first
    pub fn resolve(&mut self, name: &str, refresh: bool) -> Result<PluginFactory, RegistryError> {
        if refresh {
            self.rescan();
        }
        let qualified = qualified_name(name);
        self.manifests
            .get(&qualified)
            .or_else(|| self.search_path.get(&qualified))
            .or_else(|| self.builtin.get(&qualified))
            .cloned()
            .ok_or_else(|| {
                debug!(plugin = %name, qualified = %qualified, "No provider found");
                RegistryError::NotFound(name.to_string())
            })
    }

    /// Every resolvable plugin name, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .manifests
            .keys()
            .chain(self.search_path.keys())
            .chain(self.builtin.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::new()
    }
}
