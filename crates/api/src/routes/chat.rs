use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use worknest_services::{chat::RoomSummary, dao::PaginationParams};

use super::object_id;
use crate::{
    error::ApiError,
    extractors::auth::AuthUser,
    state::AppState,
    ws::events::{MessagePayload, ServerEvent},
};

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub room: String,
    pub items: Vec<MessagePayload>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

pub async fn my_rooms(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<RoomSummary>>, ApiError> {
    Ok(Json(state.chat.my_rooms(&auth.actor).await?))
}

pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let page = state.chat.history(&auth.actor, &room_id, &params).await?;
    Ok(Json(HistoryResponse {
        room: room_id,
        items: page.items.into_iter().map(Into::into).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message_id = object_id(&message_id, "message_id")?;
    let removed = state.chat.delete_message(&auth.actor, message_id).await?;

    state.gateway.broadcast(
        &removed.room,
        &ServerEvent::MessageDeleted {
            room: removed.room.clone(),
            message_id: message_id.to_hex(),
        },
        None,
    );
    Ok(Json(serde_json::json!({ "deleted": true })))
}
