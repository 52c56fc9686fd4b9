use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bson::oid::ObjectId;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::ServerEvent;

/// Outbound frames for one socket; drained by that socket's writer task.
pub type Outbound = mpsc::UnboundedReceiver<String>;

struct Connection {
    user_id: ObjectId,
    tx: mpsc::UnboundedSender<String>,
    /// Joined rooms and the company each one belongs to.
    rooms: HashMap<String, ObjectId>,
}

/// Live socket registry and room membership.
///
/// Sends are queued per connection, so enqueue order is delivery order. The
/// per-room sequencer is held by callers across persist and fan-out.
pub struct RoomGateway {
    connections: DashMap<String, Connection>,
    rooms: DashMap<String, HashSet<String>>,
    sequencers: DashMap<String, Arc<Mutex<()>>>,
}

impl RoomGateway {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
            sequencers: DashMap::new(),
        }
    }

    pub fn register(&self, user_id: ObjectId) -> (String, Outbound) {
        let connection_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.insert(
            connection_id.clone(),
            Connection {
                user_id,
                tx,
                rooms: HashMap::new(),
            },
        );
        (connection_id, rx)
    }

    /// Drops the connection and takes it out of every room it joined.
    pub fn unregister(&self, connection_id: &str) -> Vec<String> {
        let Some((_, connection)) = self.connections.remove(connection_id) else {
            return Vec::new();
        };
        let rooms: Vec<String> = connection.rooms.into_keys().collect();
        for room in &rooms {
            self.drop_member(room, connection_id);
        }
        rooms
    }

    /// Returns false if the connection was already in the room.
    pub fn join(&self, connection_id: &str, room: &str, company_id: ObjectId) -> bool {
        let newly = match self.connections.get_mut(connection_id) {
            Some(mut connection) => connection
                .rooms
                .insert(room.to_string(), company_id)
                .is_none(),
            None => return false,
        };
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection_id.to_string());
        newly
    }

    pub fn leave(&self, connection_id: &str, room: &str) -> bool {
        let was_member = self
            .connections
            .get_mut(connection_id)
            .is_some_and(|mut c| c.rooms.remove(room).is_some());
        if was_member {
            self.drop_member(room, connection_id);
        }
        was_member
    }

    /// Company of `room` if this connection joined it.
    pub fn joined_company(&self, connection_id: &str, room: &str) -> Option<ObjectId> {
        self.connections
            .get(connection_id)
            .and_then(|c| c.rooms.get(room).copied())
    }

    pub fn user_of(&self, connection_id: &str) -> Option<ObjectId> {
        self.connections.get(connection_id).map(|c| c.user_id)
    }

    pub fn sequencer(&self, room: &str) -> Arc<Mutex<()>> {
        self.sequencers
            .entry(room.to_string())
            .or_default()
            .clone()
    }

    pub fn send_to(&self, connection_id: &str, event: &ServerEvent) {
        if let Some(connection) = self.connections.get(connection_id) {
            if connection.tx.send(event.to_text()).is_err() {
                debug!(%connection_id, "Dropping frame for closed connection");
            }
        }
    }

    /// Queues `event` for every connection in `room`, optionally skipping one.
    /// Returns how many connections it was queued for.
    pub fn broadcast(&self, room: &str, event: &ServerEvent, except: Option<&str>) -> usize {
        let members: Vec<String> = match self.rooms.get(room) {
            Some(members) => members.iter().cloned().collect(),
            None => return 0,
        };
        let text = event.to_text();

        let mut delivered = 0;
        for connection_id in members {
            if except == Some(connection_id.as_str()) {
                continue;
            }
            let Some(connection) = self.connections.get(&connection_id) else {
                continue;
            };
            match connection.tx.send(text.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(%connection_id, %room, "Room member has no live writer"),
            }
        }
        delivered
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn drop_member(&self, room: &str, connection_id: &str) {
        let now_empty = match self.rooms.get_mut(room) {
            Some(mut members) => {
                members.remove(connection_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.rooms.remove_if(room, |_, members| members.is_empty());
            // Kept while a send still holds or waits on it.
            self.sequencers
                .remove_if(room, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

impl Default for RoomGateway {
    fn default() -> Self {
        Self::new()
    }
}
