use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// One row per (user, project). The role stored here is the only input the
/// authorization engine reads for project-scoped decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub project_id: ObjectId,
    pub company_id: ObjectId,
    pub role: ProjectRole,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Admin,
    Manager,
    Employee,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::Manager => "manager",
            ProjectRole::Employee => "employee",
        }
    }

    /// Admins and managers run the project day to day.
    pub fn is_lead(&self) -> bool {
        matches!(self, ProjectRole::Admin | ProjectRole::Manager)
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Membership {
    pub const COLLECTION: &'static str = "project_members";
}
