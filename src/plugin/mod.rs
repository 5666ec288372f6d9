// Plugin contract, name resolution and the load/unload lifecycle

pub use catalog::{qualified_name, title_case, PluginCatalog, PluginFactory};
pub use manifest::{parse_manifest, scan_plugin_dir, ManifestError, ManifestPlugin};
pub use registry::{PluginRegistry, RegistryError};
pub use types::{AsAny, CommandSpec, Plugin};

mod catalog;
mod manifest;
mod registry;
mod types;
