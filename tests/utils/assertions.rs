//! Test assertion helpers - fluent API for verifying what the bot sent
#![allow(dead_code)] // Test utilities may not all be used in every test

use lazysusan::TransportAction;

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Consumes the actions recorded so far and checks them in order
pub struct ActionAssertion {
    actions: Vec<TransportAction>,
}

impl ActionAssertion {
    pub fn for_setup(setup: &TestSetup) -> Self {
        Self {
            actions: setup.transport.take_actions(),
        }
    }

    pub fn actions(&self) -> &[TransportAction] {
        &self.actions
    }

    pub fn nothing_sent(self) {
        assert!(
            self.actions.is_empty(),
            "expected no actions, got {:?}",
            self.actions
        );
    }

    /// Exactly these actions were sent, in this order
    pub fn sent_exactly(self, expected: Vec<TransportAction>) {
        assert_eq!(self.actions, expected);
    }

    /// Exactly one room broadcast with this text, nothing else
    pub fn spoke(self, message: &str) {
        self.sent_exactly(vec![TransportAction::Speak {
            message: message.to_string(),
        }]);
    }

    /// Exactly one private message with this text to `user_id`, nothing else
    pub fn pm_to(self, user_id: &str, message: &str) {
        self.sent_exactly(vec![TransportAction::Pm {
            message: message.to_string(),
            user_id: user_id.to_string(),
        }]);
    }

    /// Every private message sent to `user_id`, in order
    pub fn pms_to(&self, user_id: &str) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                TransportAction::Pm { message, user_id: to } if to == user_id => {
                    Some(message.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Every room broadcast, in order
    pub fn spoken(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                TransportAction::Speak { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}
