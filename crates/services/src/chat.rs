use std::collections::HashMap;

use bson::oid::ObjectId;
use serde::Serialize;
use tracing::info;
use worknest_db::models::ChatMessage;

use crate::authz::{Actor, Authorizer, RoomAction, RoomKey};
use crate::dao::{PaginatedResult, PaginationParams};
use crate::error::{ServiceError, ServiceResult};
use crate::stores::Stores;

#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub room: String,
    pub kind: &'static str,
    pub name: String,
}

pub struct ChatService {
    stores: Stores,
    authz: Authorizer,
}

pub fn parse_room(room: &str) -> ServiceResult<RoomKey> {
    room.parse().map_err(ServiceError::BadRequest)
}

impl ChatService {
    pub fn new(stores: Stores, authz: Authorizer) -> Self {
        Self { stores, authz }
    }

    /// Join rule; also gates history reads and sends. Returns the room's company.
    pub async fn authorize_join(&self, actor: &Actor, room: &RoomKey) -> ServiceResult<ObjectId> {
        self.authz.authorize_room(actor, room, RoomAction::Join).await
    }

    /// Persists a message for a room the caller has already been admitted to.
    pub async fn post(
        &self,
        actor: &Actor,
        room: &RoomKey,
        company_id: ObjectId,
        message: Option<String>,
        file_url: Option<String>,
    ) -> ServiceResult<ChatMessage> {
        let message = message.filter(|m| !m.trim().is_empty());
        let file_url = file_url.filter(|f| !f.trim().is_empty());
        if message.is_none() && file_url.is_none() {
            return Err(ServiceError::BadRequest(
                "A message or a file is required".to_string(),
            ));
        }

        Ok(self
            .stores
            .chat
            .create(
                room.to_string(),
                company_id,
                actor.user_id,
                actor.display_name.clone(),
                message,
                file_url,
            )
            .await?)
    }

    pub async fn history(
        &self,
        actor: &Actor,
        room: &str,
        params: &PaginationParams,
    ) -> ServiceResult<PaginatedResult<ChatMessage>> {
        let room = parse_room(room)?;
        self.authorize_join(actor, &room).await?;
        Ok(self.stores.chat.history(&room.to_string(), params).await?)
    }

    /// Every room the caller may join right now.
    pub async fn my_rooms(&self, actor: &Actor) -> ServiceResult<Vec<RoomSummary>> {
        let Some(company_id) = actor.company_id else {
            return Ok(Vec::new());
        };
        let company = self
            .stores
            .companies
            .find(company_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Company"))?;

        let mut rooms = vec![RoomSummary {
            room: RoomKey::Company(company_id).to_string(),
            kind: "company",
            name: company.name.clone(),
        }];

        let memberships = self
            .stores
            .memberships
            .for_user(actor.user_id, company_id)
            .await?;
        if memberships.iter().any(|m| m.role.is_lead()) {
            rooms.push(RoomSummary {
                room: RoomKey::Management(company_id).to_string(),
                kind: "management",
                name: format!("{} management", company.name),
            });
        }

        let ids: Vec<ObjectId> = memberships.iter().map(|m| m.project_id).collect();
        if !ids.is_empty() {
            let names: HashMap<ObjectId, String> = self
                .stores
                .projects
                .find_many_by_ids(&ids)
                .await?
                .into_iter()
                .filter_map(|p| p.id.map(|id| (id, p.name)))
                .collect();
            for project_id in ids {
                if let Some(name) = names.get(&project_id) {
                    rooms.push(RoomSummary {
                        room: RoomKey::Project(project_id).to_string(),
                        kind: "project",
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(rooms)
    }

    /// Deletes a message. Project rooms are moderated by their admin and
    /// manager, company rooms by the owner. Returns the removed message.
    pub async fn delete_message(
        &self,
        actor: &Actor,
        message_id: ObjectId,
    ) -> ServiceResult<ChatMessage> {
        let message = self
            .stores
            .chat
            .find(message_id)
            .await?
            .filter(|m| actor.in_company(m.company_id))
            .ok_or_else(|| ServiceError::not_found("Message"))?;
        let room = parse_room(&message.room)?;
        self.authz
            .authorize_room(actor, &room, RoomAction::Moderate)
            .await?;

        self.stores.chat.delete(message_id).await?;
        info!(%message_id, room = %message.room, by = %actor.user_id, "Chat message deleted");
        Ok(message)
    }
}
