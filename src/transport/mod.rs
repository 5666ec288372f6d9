// Transport collaborator seams
//
// The core never talks to the network itself. It pushes actions through a
// `Transport` and pulls events from an `EventSource`.

pub mod channel;
pub mod console;
pub mod types;

pub use channel::ChannelTransport;
pub use console::{forward_actions, EventSource, LineEventSource, KEEPALIVE_PERIOD};
pub use types::{Transport, TransportAction};
