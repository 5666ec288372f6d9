use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::types::{Transport, TransportAction};

/// Transport that hands every action to an unbounded channel
///
/// The receiving end belongs to whatever actually talks to the remote
/// service (the console writer in the binary, a socket task, a test).
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<TransportAction>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransportAction>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, action: TransportAction) {
        debug!(action = ?action, "Sending transport action");
        if self.sender.send(action).is_err() {
            warn!("Transport action dropped, receiver is gone");
        }
    }
}
