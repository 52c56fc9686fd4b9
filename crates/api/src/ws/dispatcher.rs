use bson::oid::ObjectId;
use tracing::{debug, info, warn};
use worknest_services::{
    Actor, ServiceError, ServiceResult,
    authz::RoomKey,
    chat::parse_room,
};

use super::events::{ClientEvent, MessagePayload, ServerEvent};
use crate::state::AppState;

/// Handles one text frame. Failures go back to the sender only.
pub async fn handle_client_message(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    text: &str,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(%user_id, %connection_id, %e, "Malformed WS frame");
            state.gateway.send_to(
                connection_id,
                &ServerEvent::error("bad_request", format!("Malformed event: {e}")),
            );
            return;
        }
    };

    if let Err(err) = dispatch(state, user_id, connection_id, event).await {
        warn!(%user_id, %connection_id, kind = err.kind(), %err, "WS event rejected");
        let message = match err.kind() {
            "internal" => "Internal server error".to_string(),
            _ => err.to_string(),
        };
        state
            .gateway
            .send_to(connection_id, &ServerEvent::error(err.kind(), message));
    }
}

async fn dispatch(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    event: ClientEvent,
) -> ServiceResult<()> {
    match event {
        ClientEvent::JoinCompanyRoom { company_id } => {
            let room = RoomKey::Company(parse_id(&company_id, "company_id")?);
            join(state, user_id, connection_id, room).await
        }
        ClientEvent::JoinProjectRoom { project_id } => {
            let room = RoomKey::Project(parse_id(&project_id, "project_id")?);
            join(state, user_id, connection_id, room).await
        }
        ClientEvent::JoinManagementRoom { company_id } => {
            let room = RoomKey::Management(parse_id(&company_id, "company_id")?);
            join(state, user_id, connection_id, room).await
        }
        ClientEvent::SendMessage { room, message } => {
            send(state, user_id, connection_id, &room, Some(message), None).await
        }
        ClientEvent::ShareFile {
            room,
            file_url,
            message,
        } => send(state, user_id, connection_id, &room, message, Some(file_url)).await,
        ClientEvent::Typing { room, is_typing } => {
            typing(state, user_id, connection_id, &room, is_typing).await
        }
        ClientEvent::LeaveRoom { room } => {
            if state.gateway.leave(connection_id, &room) {
                state
                    .gateway
                    .send_to(connection_id, &ServerEvent::LeftRoom { room });
            }
            Ok(())
        }
        ClientEvent::Ping => {
            state.gateway.send_to(connection_id, &ServerEvent::Pong);
            Ok(())
        }
    }
}

fn parse_id(raw: &str, field: &str) -> ServiceResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| ServiceError::BadRequest(format!("Invalid {field}")))
}

async fn current_actor(state: &AppState, user_id: ObjectId) -> ServiceResult<Actor> {
    state
        .stores
        .load_actor(user_id)
        .await?
        .map(|(_, actor)| actor)
        .ok_or_else(|| ServiceError::Unauthorized("User no longer exists".to_string()))
}

async fn join(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    room: RoomKey,
) -> ServiceResult<()> {
    let actor = current_actor(state, user_id).await?;
    let company_id = state.chat.authorize_join(&actor, &room).await?;

    let room = room.to_string();
    if state.gateway.join(connection_id, &room, company_id) {
        info!(%user_id, %connection_id, %room, "Joined room");
    }
    state
        .gateway
        .send_to(connection_id, &ServerEvent::JoinedRoom { room });
    Ok(())
}

async fn send(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    room: &str,
    message: Option<String>,
    file_url: Option<String>,
) -> ServiceResult<()> {
    let key = parse_room(room)?;
    let room = key.to_string();
    let Some(company_id) = state.gateway.joined_company(connection_id, &room) else {
        return Err(ServiceError::Forbidden(
            "Join the room before sending to it".to_string(),
        ));
    };

    // Membership may have changed since the join.
    let actor = current_actor(state, user_id).await?;
    if let Err(err) = state.chat.authorize_join(&actor, &key).await {
        state.gateway.leave(connection_id, &room);
        state.gateway.send_to(
            connection_id,
            &ServerEvent::LeftRoom { room: room.clone() },
        );
        return Err(err);
    }

    let is_file = file_url.is_some();
    let sequencer = state.gateway.sequencer(&room);
    let _order = sequencer.lock().await;

    let saved = state
        .chat
        .post(&actor, &key, company_id, message, file_url)
        .await?;
    let payload = MessagePayload::from(saved);
    let event = if is_file {
        ServerEvent::FileShared(payload)
    } else {
        ServerEvent::ReceiveMessage(payload)
    };
    let delivered = state.gateway.broadcast(&room, &event, None);
    debug!(%user_id, %room, delivered, "Message fanned out");
    Ok(())
}

async fn typing(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    room: &str,
    is_typing: bool,
) -> ServiceResult<()> {
    let room = parse_room(room)?.to_string();
    if state.gateway.joined_company(connection_id, &room).is_none() {
        debug!(%user_id, %room, "Typing event for unjoined room dropped");
        return Ok(());
    }
    let user_name = match state.stores.load_actor(user_id).await? {
        Some((_, actor)) => actor.display_name,
        None => return Ok(()),
    };

    state.gateway.broadcast(
        &room,
        &ServerEvent::Typing {
            room: room.clone(),
            user_id: user_id.to_hex(),
            user_name,
            is_typing,
        },
        Some(connection_id),
    );
    Ok(())
}
