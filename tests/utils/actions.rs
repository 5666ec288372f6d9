#![allow(dead_code)] // Test utilities may not all be used in every test

use lazysusan::event::User;
use lazysusan::RoomEvent;

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Deliver one event to the bot
    pub fn emit(&mut self, event: RoomEvent) {
        self.bot.handle_event(event);
    }

    /// Say something in the room as `user_id` (display name equals the id)
    pub fn send_speak(&mut self, user_id: &str, text: &str) {
        self.emit(RoomEvent::Speak {
            user_id: user_id.to_string(),
            name: user_id.to_string(),
            text: text.to_string(),
        });
    }

    /// Privately message the bot as `user_id`
    pub fn send_pm(&mut self, user_id: &str, text: &str) {
        self.emit(RoomEvent::PrivateMessage {
            sender_id: user_id.to_string(),
            text: text.to_string(),
        });
    }

    pub fn user_joins(&mut self, user_id: &str) {
        self.emit(RoomEvent::Registered {
            users: vec![User::new(user_id)],
        });
    }

    pub fn user_leaves(&mut self, user_id: &str) {
        self.emit(RoomEvent::Deregistered {
            users: vec![User::new(user_id)],
        });
    }

    pub fn dj_added(&mut self, user_id: &str) {
        self.emit(RoomEvent::AddDj {
            users: vec![User::new(user_id)],
        });
    }

    pub fn dj_removed(&mut self, user_id: &str) {
        self.emit(RoomEvent::RemDj {
            users: vec![User::new(user_id)],
        });
    }

    pub fn command_tokens(&self) -> Vec<String> {
        self.bot.registry().commands().tokens()
    }
}
