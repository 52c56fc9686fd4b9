use serde::{Deserialize, Serialize};
use worknest_db::models::ChatMessage;

/// Frames a client may send, `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinCompanyRoom {
        company_id: String,
    },
    JoinProjectRoom {
        project_id: String,
    },
    JoinManagementRoom {
        company_id: String,
    },
    SendMessage {
        room: String,
        message: String,
    },
    ShareFile {
        room: String,
        file_url: String,
        #[serde(default)]
        message: Option<String>,
    },
    Typing {
        room: String,
        #[serde(default = "default_typing")]
        is_typing: bool,
    },
    LeaveRoom {
        room: String,
    },
    Ping,
}

fn default_typing() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagePayload {
    pub id: String,
    pub room: String,
    pub sender_id: String,
    pub sender_name: String,
    pub message: Option<String>,
    pub file_url: Option<String>,
    pub created_at: String,
}

impl From<ChatMessage> for MessagePayload {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id.map(|id| id.to_hex()).unwrap_or_default(),
            room: m.room,
            sender_id: m.sender_id.to_hex(),
            sender_name: m.sender_name,
            message: m.message,
            file_url: m.file_url,
            created_at: m.created_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    Connected {
        connection_id: String,
        user_id: String,
    },
    JoinedRoom {
        room: String,
    },
    LeftRoom {
        room: String,
    },
    ReceiveMessage(MessagePayload),
    FileShared(MessagePayload),
    Typing {
        room: String,
        user_id: String,
        user_name: String,
        is_typing: bool,
    },
    MessageDeleted {
        room: String,
        message_id: String,
    },
    Pong,
    Error {
        kind: String,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
