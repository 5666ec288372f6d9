use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "lazysusan.toml";
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Problems with the configuration; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No lazysusan.toml found (searched: {0}).")]
    NotFound(String),

    #[error("No section `{0}` found in lazysusan.toml.")]
    MissingSection(String),

    #[error("Missing required setting `{0}`.")]
    MissingKey(&'static str),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Settings consumed by the bot core
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub user_id: String,
    pub auth_id: String,
    pub room_id: String,
    pub admin_ids: HashSet<String>,
    /// Plugins to load at startup, in order
    pub plugins: Vec<String>,
    /// Every remaining key, available to plugins
    pub settings: HashMap<String, String>,
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split_whitespace().map(str::to_string)
}

impl BotConfig {
    /// Build the configuration from a flat string-keyed mapping
    pub fn from_map(mut map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut required = |key: &'static str| map.remove(key).ok_or(ConfigError::MissingKey(key));
        let user_id = required("user_id")?;
        let auth_id = required("auth_id")?;
        let room_id = required("room_id")?;

        let admin_ids = map
            .remove("admin_ids")
            .map(|v| split_list(&v).collect())
            .unwrap_or_default();
        let plugins = map
            .remove("plugins")
            .map(|v| split_list(&v).collect())
            .unwrap_or_default();

        Ok(Self {
            user_id,
            auth_id,
            room_id,
            admin_ids,
            plugins,
            settings: map,
        })
    }

    /// Locate the config file and read the given section from it
    pub fn load(section: &str, explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let candidates = config_search_paths(explicit_path);
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| {
                ConfigError::NotFound(
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            })?;

        debug!(path = %path.display(), section = %section, "Reading configuration");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let map = parse_section(&text, section, &path.display().to_string())?;
        Self::from_map(map)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_ids.contains(user_id)
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

/// Candidate config file locations, most specific first
pub fn config_search_paths(explicit_path: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit_path {
        return vec![path.to_path_buf()];
    }
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

fn stringify(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(stringify)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Flatten one section of a TOML document into a string map
///
/// Top-level keys form the `DEFAULT` section and are inherited by every
/// named section (a named section's own keys win).
pub fn parse_section(
    text: &str,
    section: &str,
    origin: &str,
) -> Result<HashMap<String, String>, ConfigError> {
    let document: toml::Table = text.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;

    let mut map: HashMap<String, String> = document
        .iter()
        .filter(|(_, v)| !v.is_table())
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect();

    if section == DEFAULT_SECTION {
        return Ok(map);
    }

    let table = document
        .get(section)
        .and_then(toml::Value::as_table)
        .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;

    for (key, value) in table {
        map.insert(key.clone(), stringify(value));
    }
    Ok(map)
}
