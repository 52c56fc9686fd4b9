use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room: String,
    pub company_id: ObjectId,
    pub sender_id: ObjectId,
    pub sender_name: String,
    pub message: Option<String>,
    pub file_url: Option<String>,
    pub created_at: DateTime,
}

impl ChatMessage {
    pub const COLLECTION: &'static str = "chat_messages";
}
