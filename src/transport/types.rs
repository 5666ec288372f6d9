use serde::{Deserialize, Serialize};

/// Outbound requests the bot makes of the remote room service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransportAction {
    Speak { message: String },
    Pm { message: String, user_id: String },
    RoomRegister { room_id: String },
    RoomDeregister,
    UserInfo,
    AddDj,
    RemDj,
    Skip,
}

/// The connection to the remote chatroom service
///
/// Every call is fire-and-forget. When the service answers (room changes,
/// user info, leave results) the answer arrives later as its own event.
pub trait Transport: Send + Sync {
    fn send(&self, action: TransportAction);

    fn speak(&self, message: &str) {
        self.send(TransportAction::Speak {
            message: message.to_string(),
        });
    }

    fn pm(&self, message: &str, user_id: &str) {
        self.send(TransportAction::Pm {
            message: message.to_string(),
            user_id: user_id.to_string(),
        });
    }

    fn room_register(&self, room_id: &str) {
        self.send(TransportAction::RoomRegister {
            room_id: room_id.to_string(),
        });
    }

    fn room_deregister(&self) {
        self.send(TransportAction::RoomDeregister);
    }

    fn user_info(&self) {
        self.send(TransportAction::UserInfo);
    }

    fn add_dj(&self) {
        self.send(TransportAction::AddDj);
    }

    fn rem_dj(&self) {
        self.send(TransportAction::RemDj);
    }

    fn skip(&self) {
        self.send(TransportAction::Skip);
    }
}
