use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use bson::oid::ObjectId;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{dispatcher, events::ServerEvent};
use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, token_from_headers},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Authenticates once, before the upgrade. A bad credential gets a plain 401.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = params.token.or_else(|| token_from_headers(&headers)) else {
        return ApiError::Unauthorized("Missing authentication token".to_string()).into_response();
    };

    let auth = match AuthUser::from_token(&state, &token).await {
        Ok(auth) => auth,
        Err(e) => {
            debug!(error = ?e, "WebSocket handshake rejected");
            return e.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, auth.user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: ObjectId) {
    let (mut sink, mut stream) = socket.split();
    let (connection_id, mut outbound) = state.gateway.register(user_id);
    info!(%user_id, %connection_id, "WebSocket connected");

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    state.gateway.send_to(
        &connection_id,
        &ServerEvent::Connected {
            connection_id: connection_id.clone(),
            user_id: user_id.to_hex(),
        },
    );

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                dispatcher::handle_client_message(&state, user_id, &connection_id, text.as_str())
                    .await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(%user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    let rooms = state.gateway.unregister(&connection_id);
    // The writer ends once its queue is dropped by `unregister`.
    let _ = writer.await;
    info!(%user_id, %connection_id, rooms = rooms.len(), "WebSocket disconnected");
}
