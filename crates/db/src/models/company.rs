use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: ObjectId,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Company {
    pub const COLLECTION: &'static str = "companies";

    pub fn is_owned_by(&self, user_id: ObjectId) -> bool {
        self.owner_id == user_id
    }
}
