// Event intake: the typed events the transport delivers, the listeners
// plugins subscribe with, and the dispatcher that ties them together.

pub use dispatcher::Bot;
pub use events::{
    ChatMessage, EventKind, MessageKind, RoomEvent, RoomInfo, RoomMetadata, User,
};
pub use handler::{guarded, isolate, HandlerError, HandlerResult};
pub use listeners::{
    listener, Listener, ListenerFn, ListenerTable, SubscriptionChange, SubscriptionId,
};

mod dispatcher;
mod events;
mod handler;
mod listeners;
