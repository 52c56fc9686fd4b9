use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use worknest_db::models::ProjectRole;

use super::{Actor, Denial};

/// Realtime room names: `company:<id>`, `project:<id>` and
/// `company:<id>:management`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Company(ObjectId),
    Project(ObjectId),
    Management(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    /// Join, read history, send.
    Join,
    /// Delete messages.
    Moderate,
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Company(id) => write!(f, "company:{id}"),
            RoomKey::Project(id) => write!(f, "project:{id}"),
            RoomKey::Management(id) => write!(f, "company:{id}:management"),
        }
    }
}

impl FromStr for RoomKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |id: &str| {
            ObjectId::parse_str(id).map_err(|_| format!("Invalid room id in '{s}'"))
        };
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("company"), Some(id), None, None) => Ok(RoomKey::Company(parse(id)?)),
            (Some("project"), Some(id), None, None) => Ok(RoomKey::Project(parse(id)?)),
            (Some("company"), Some(id), Some("management"), None) => {
                Ok(RoomKey::Management(parse(id)?))
            }
            _ => Err(format!("Unknown room '{s}'")),
        }
    }
}

#[derive(Debug, Default)]
pub struct RoomFacts {
    pub company_owner: Option<ObjectId>,
    pub project_company: Option<ObjectId>,
    pub role: Option<ProjectRole>,
    pub leads_in_company: bool,
}

/// Returns the company a room belongs to if `actor` may perform `action` in it.
/// Rooms of another company, or of a missing project, are reported as absent.
pub fn decide_room(
    actor: &Actor,
    room: &RoomKey,
    action: RoomAction,
    facts: &RoomFacts,
) -> Result<ObjectId, Denial> {
    let company_id = match room {
        RoomKey::Company(id) | RoomKey::Management(id) => Some(*id),
        RoomKey::Project(_) => facts.project_company,
    }
    .filter(|id| actor.in_company(*id))
    .ok_or(Denial::NotFound("Room"))?;

    let allowed = match (room, action) {
        (RoomKey::Company(_), RoomAction::Join) => true,
        (RoomKey::Management(_), RoomAction::Join) => facts.leads_in_company,
        (RoomKey::Company(_) | RoomKey::Management(_), RoomAction::Moderate) => {
            facts.company_owner == Some(actor.user_id)
        }
        (RoomKey::Project(_), RoomAction::Join) => facts.role.is_some(),
        (RoomKey::Project(_), RoomAction::Moderate) => facts.role.is_some_and(|r| r.is_lead()),
    };

    if allowed {
        Ok(company_id)
    } else {
        Err(Denial::Room(room.to_string()))
    }
}
