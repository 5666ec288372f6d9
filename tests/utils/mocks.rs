use std::sync::{Arc, Mutex};

use lazysusan::transport::{Transport, TransportAction};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every action the bot asks the transport to perform
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Arc<Mutex<Vec<TransportAction>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything sent so far
    pub fn take_actions(&self) -> Vec<TransportAction> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Transport for MockTransport {
    fn send(&self, action: TransportAction) {
        self.sent.lock().unwrap().push(action);
    }
}
