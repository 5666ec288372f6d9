// LazySusan: an extensible chat-bot core
//
// Events come in from a transport, commands are routed to built-in or
// plugin handlers behind permission guards, and deferred actions run
// cooperatively between events.

pub mod command;
pub mod config;
pub mod context;
pub mod event;
pub mod plugin;
pub mod plugins;
pub mod room;
pub mod scheduler;
pub mod shared;
pub mod transport;

// Re-export commonly used types for easier access in tests
pub use config::{BotConfig, ConfigError};
pub use context::{BotContext, PluginContext};
pub use event::{Bot, ChatMessage, EventKind, HandlerError, HandlerResult, RoomEvent};
pub use plugin::{CommandSpec, Plugin, PluginCatalog, RegistryError};
pub use room::RoomState;
pub use scheduler::Scheduler;
pub use shared::BotError;
pub use transport::{ChannelTransport, EventSource, Transport, TransportAction};
