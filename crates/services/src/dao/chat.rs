use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use worknest_db::models::ChatMessage;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

pub struct ChatDao {
    pub base: BaseDao<ChatMessage>,
}

impl ChatDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ChatMessage::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        room: String,
        company_id: ObjectId,
        sender_id: ObjectId,
        sender_name: String,
        message: Option<String>,
        file_url: Option<String>,
    ) -> DaoResult<ChatMessage> {
        let chat = ChatMessage {
            id: None,
            room,
            company_id,
            sender_id,
            sender_name,
            message,
            file_url,
            created_at: DateTime::now(),
        };

        let id = self.base.insert_one(&chat).await?;
        Ok(ChatMessage { id: Some(id), ..chat })
    }

    pub async fn find(&self, message_id: ObjectId) -> DaoResult<Option<ChatMessage>> {
        self.base.find_one(doc! { "_id": message_id }).await
    }

    /// Oldest first, so pages read in conversation order.
    pub async fn history(
        &self,
        room: &str,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<ChatMessage>> {
        self.base
            .find_paginated(
                doc! { "room": room },
                Some(doc! { "created_at": 1, "_id": 1 }),
                params,
            )
            .await
    }

    pub async fn delete(&self, message_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "_id": message_id }).await
    }
}
