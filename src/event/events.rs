use serde::{Deserialize, Serialize};
use strum_macros::EnumDiscriminants;

/// A user as reported by roster notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "userid")]
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomMetadata {
    #[serde(default)]
    pub djs: Vec<String>,
    pub max_djs: usize,
    #[serde(default)]
    pub moderator_id: Vec<String>,
    #[serde(default)]
    pub current_dj: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomInfo {
    #[serde(rename = "roomid", default)]
    pub room_id: Option<String>,
    pub metadata: RoomMetadata,
}

/// Events delivered by the transport collaborator
///
/// Events are facts about things that already happened in the remote room.
/// The `command` tag carries the remote service's own event names.
#[derive(Debug, Clone, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(EventKind), derive(Hash))]
#[serde(tag = "command")]
pub enum RoomEvent {
    /// Someone spoke in the shared room channel
    #[serde(rename = "speak")]
    Speak {
        #[serde(rename = "userid")]
        user_id: String,
        name: String,
        text: String,
    },

    /// Someone sent the bot a private message
    #[serde(rename = "pmmed")]
    PrivateMessage {
        #[serde(rename = "senderid")]
        sender_id: String,
        text: String,
    },

    /// Users entered the room
    #[serde(rename = "registered")]
    Registered {
        #[serde(rename = "user")]
        users: Vec<User>,
    },

    /// Users left the room
    #[serde(rename = "deregistered")]
    Deregistered {
        #[serde(rename = "user")]
        users: Vec<User>,
    },

    #[serde(rename = "add_dj")]
    AddDj {
        #[serde(rename = "user")]
        users: Vec<User>,
    },

    #[serde(rename = "rem_dj")]
    RemDj {
        #[serde(rename = "user")]
        users: Vec<User>,
    },

    #[serde(rename = "new_moderator")]
    NewModerator {
        #[serde(rename = "userid")]
        user_id: String,
    },

    #[serde(rename = "rem_moderator")]
    RemModerator {
        #[serde(rename = "userid")]
        user_id: String,
    },

    /// Result of a room join, carrying the full room snapshot on success
    #[serde(rename = "roomChanged")]
    RoomChanged {
        success: bool,
        #[serde(default)]
        errno: Option<i64>,
        #[serde(default)]
        room: Option<RoomInfo>,
        #[serde(default)]
        users: Vec<User>,
    },

    #[serde(rename = "booted_user")]
    BootedUser {
        #[serde(rename = "userid")]
        user_id: String,
    },

    /// The connection is authenticated and usable
    #[serde(rename = "ready")]
    Ready,

    /// Completion of a user-info request for the bot itself
    #[serde(rename = "user_info")]
    UserInfo {
        #[serde(rename = "userid", default)]
        user_id: Option<String>,
        name: String,
    },

    /// Completion of a room-leave request
    #[serde(rename = "room_deregistered")]
    RoomDeregistered { success: bool },

    #[serde(rename = "newsong")]
    NewSong {
        #[serde(default)]
        current_dj: Option<String>,
    },

    #[serde(rename = "endsong")]
    EndSong,

    /// Periodic heartbeat from the transport
    #[serde(rename = "keepalive")]
    KeepAlive,

    #[serde(other)]
    Unknown,
}

impl RoomEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }

    /// The remote service's name for this event
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Speak { .. } => "speak",
            RoomEvent::PrivateMessage { .. } => "pmmed",
            RoomEvent::Registered { .. } => "registered",
            RoomEvent::Deregistered { .. } => "deregistered",
            RoomEvent::AddDj { .. } => "add_dj",
            RoomEvent::RemDj { .. } => "rem_dj",
            RoomEvent::NewModerator { .. } => "new_moderator",
            RoomEvent::RemModerator { .. } => "rem_moderator",
            RoomEvent::RoomChanged { .. } => "roomChanged",
            RoomEvent::BootedUser { .. } => "booted_user",
            RoomEvent::Ready => "ready",
            RoomEvent::UserInfo { .. } => "user_info",
            RoomEvent::RoomDeregistered { .. } => "room_deregistered",
            RoomEvent::NewSong { .. } => "newsong",
            RoomEvent::EndSong => "endsong",
            RoomEvent::KeepAlive => "keepalive",
            RoomEvent::Unknown => "unknown",
        }
    }

    /// Users carried by a roster notification
    pub fn users(&self) -> &[User] {
        match self {
            RoomEvent::Registered { users }
            | RoomEvent::Deregistered { users }
            | RoomEvent::AddDj { users }
            | RoomEvent::RemDj { users }
            | RoomEvent::RoomChanged { users, .. } => users,
            _ => &[],
        }
    }

    /// View a message event as a chat message; `None` for every other kind
    pub fn as_chat_message(&self) -> Option<ChatMessage> {
        match self {
            RoomEvent::Speak {
                user_id,
                name,
                text,
            } => Some(ChatMessage::broadcast(user_id, name, text)),
            RoomEvent::PrivateMessage { sender_id, text } => {
                Some(ChatMessage::private(sender_id, text))
            }
            _ => None,
        }
    }
}

/// Where a chat message came from, and therefore where replies go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Broadcast,
    PrivateMessage,
}

/// A textual message addressed to the room or to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub kind: MessageKind,
    pub sender_id: String,
    /// Only broadcasts carry the sender's display name
    pub sender_name: Option<String>,
    pub text: String,
}

impl ChatMessage {
    pub fn broadcast(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: MessageKind::Broadcast,
            sender_id: sender_id.into(),
            sender_name: Some(sender_name.into()),
            text: text.into(),
        }
    }

    pub fn private(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::PrivateMessage,
            sender_id: sender_id.into(),
            sender_name: None,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_speak_event() {
        let event: RoomEvent = serde_json::from_str(
            r#"{"command":"speak","userid":"u1","name":"alice","text":"/echo hi"}"#,
        )
        .unwrap();

        assert_eq!(event.kind(), EventKind::Speak);
        let message = event.as_chat_message().unwrap();
        assert_eq!(message.kind, MessageKind::Broadcast);
        assert_eq!(message.sender_id, "u1");
        assert_eq!(message.sender_name.as_deref(), Some("alice"));
        assert_eq!(message.text, "/echo hi");
    }

    #[test]
    fn test_deserialize_room_changed_snapshot() {
        let event: RoomEvent = serde_json::from_str(
            r#"{
                "command": "roomChanged",
                "success": true,
                "room": {
                    "roomid": "r1",
                    "metadata": {"djs": ["d1"], "max_djs": 5, "moderator_id": ["m1"]}
                },
                "users": [{"userid": "d1"}, {"userid": "m1", "name": "mod"}]
            }"#,
        )
        .unwrap();

        match &event {
            RoomEvent::RoomChanged {
                success,
                room: Some(room),
                ..
            } => {
                assert!(success);
                assert_eq!(room.room_id.as_deref(), Some("r1"));
                assert_eq!(room.metadata.max_djs, 5);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(event.users().len(), 2);
    }

    #[test]
    fn test_unrecognized_command_is_unknown() {
        let event: RoomEvent =
            serde_json::from_str(r#"{"command":"snagged","userid":"u1"}"#).unwrap();
        assert_eq!(event.kind(), EventKind::Unknown);
        assert!(event.as_chat_message().is_none());
    }

    #[test]
    fn test_private_message_has_no_sender_name() {
        let event = RoomEvent::PrivateMessage {
            sender_id: "u2".to_string(),
            text: "/about".to_string(),
        };
        let message = event.as_chat_message().unwrap();
        assert_eq!(message.kind, MessageKind::PrivateMessage);
        assert_eq!(message.sender_name, None);
        assert_eq!(event.name(), "pmmed");
    }
}
