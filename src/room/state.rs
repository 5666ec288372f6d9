use std::collections::HashSet;
use tracing::debug;

use crate::event::{RoomInfo, User};

/// Snapshot of the room the bot is sitting in
///
/// Only the dispatcher's built-in roster handlers mutate this; plugins get
/// read access through the bot context.
#[derive(Debug, Clone, Default)]
pub struct RoomState {
    pub bot_id: String,
    /// Display name, recorded once from the identity reply
    pub username: Option<String>,
    pub room_id: Option<String>,
    pub dj_ids: HashSet<String>,
    pub listener_ids: HashSet<String>,
    pub moderator_ids: HashSet<String>,
    pub max_djs: usize,
    pub current_dj_id: Option<String>,
}

impl RoomState {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            ..Self::default()
        }
    }

    pub fn is_dj(&self) -> bool {
        self.dj_ids.contains(&self.bot_id)
    }

    pub fn is_playing(&self) -> bool {
        self.current_dj_id.as_deref() == Some(self.bot_id.as_str())
    }

    pub fn is_moderator(&self, user_id: &str) -> bool {
        self.moderator_ids.contains(user_id)
    }

    pub fn add_listeners(&mut self, users: &[User]) {
        for user in users {
            self.listener_ids.insert(user.user_id.clone());
        }
    }

    pub fn remove_listeners(&mut self, users: &[User]) {
        for user in users {
            if !self.listener_ids.remove(&user.user_id) {
                debug!(user_id = %user.user_id, "Unknown listener left the room");
            }
        }
    }

    pub fn add_djs(&mut self, users: &[User]) {
        for user in users {
            self.dj_ids.insert(user.user_id.clone());
        }
    }

    pub fn remove_djs(&mut self, users: &[User]) {
        for user in users {
            if !self.dj_ids.remove(&user.user_id) {
                debug!(user_id = %user.user_id, "Unknown dj stepped down");
            }
        }
    }

    pub fn add_moderator(&mut self, user_id: &str) {
        self.moderator_ids.insert(user_id.to_string());
    }

    pub fn remove_moderator(&mut self, user_id: &str) {
        if !self.moderator_ids.remove(user_id) {
            debug!(user_id = %user_id, "Unknown moderator removed");
        }
    }

    /// Replace the roster with the snapshot delivered on a successful room change
    pub fn apply_room_snapshot(&mut self, room: &RoomInfo, users: &[User]) {
        if room.room_id.is_some() {
            self.room_id = room.room_id.clone();
        }
        self.dj_ids = room.metadata.djs.iter().cloned().collect();
        self.listener_ids = users.iter().map(|u| u.user_id.clone()).collect();
        self.max_djs = room.metadata.max_djs;
        self.moderator_ids = room.metadata.moderator_id.iter().cloned().collect();
        self.current_dj_id = room.metadata.current_dj.clone();
    }

    /// Forget everything tied to the current room
    pub fn clear_room(&mut self) {
        self.room_id = None;
        self.dj_ids.clear();
        self.listener_ids.clear();
        self.moderator_ids.clear();
        self.current_dj_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RoomMetadata;

    fn users(ids: &[&str]) -> Vec<User> {
        ids.iter().map(|id| User::new(*id)).collect()
    }

    #[test]
    fn test_roster_updates() {
        let mut state = RoomState::new("bot");
        state.add_listeners(&users(&["a", "b"]));
        state.add_djs(&users(&["a"]));
        state.add_moderator("b");

        assert_eq!(state.listener_ids.len(), 2);
        assert!(state.dj_ids.contains("a"));
        assert!(state.is_moderator("b"));

        state.remove_listeners(&users(&["a", "missing"]));
        state.remove_djs(&users(&["a"]));
        state.remove_moderator("b");

        assert_eq!(state.listener_ids.len(), 1);
        assert!(state.dj_ids.is_empty());
        assert!(!state.is_moderator("b"));
    }

    #[test]
    fn test_room_snapshot_replaces_roster() {
        let mut state = RoomState::new("bot");
        state.add_listeners(&users(&["stale"]));

        let room = RoomInfo {
            room_id: Some("room-1".to_string()),
            metadata: RoomMetadata {
                djs: vec!["bot".to_string()],
                max_djs: 5,
                moderator_id: vec!["m".to_string()],
                current_dj: Some("bot".to_string()),
            },
        };
        state.apply_room_snapshot(&room, &users(&["bot", "m"]));

        assert_eq!(state.room_id.as_deref(), Some("room-1"));
        assert!(!state.listener_ids.contains("stale"));
        assert_eq!(state.max_djs, 5);
        assert!(state.is_dj());
        assert!(state.is_playing());
        assert!(state.is_moderator("m"));

        state.clear_room();
        assert!(state.room_id.is_none());
        assert!(!state.is_dj());
    }
}
