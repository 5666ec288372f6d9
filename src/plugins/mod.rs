// Plugins shipped with the bot, resolvable by name without a plugin directory

use std::sync::Arc;

use crate::plugin::{Plugin, PluginCatalog};

pub mod dj;
pub mod simple;
pub mod theme;

pub use dj::Dj;
pub use simple::Echo;
pub use theme::Theme;

fn provider<P: Plugin + Default>() -> crate::plugin::PluginFactory {
    Arc::new(|| Box::new(P::default()) as Box<dyn Plugin>)
}

/// A catalog holding every plugin in the built-in namespace
pub fn builtin_catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog.register_builtin("simple.Echo", provider::<Echo>());
    catalog.register_builtin("theme.Theme", provider::<Theme>());
    catalog.register_builtin("dj.Dj", provider::<Dj>());
    catalog
}
