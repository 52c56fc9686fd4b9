pub mod auth;
pub mod chat;
pub mod company;
pub mod project;
pub mod task;

use bson::oid::ObjectId;

use crate::error::ApiError;

/// Parses a hex ObjectId coming from a path segment or request body.
pub(crate) fn object_id(raw: &str, field: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

pub(crate) fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

pub(crate) fn rfc3339(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}
