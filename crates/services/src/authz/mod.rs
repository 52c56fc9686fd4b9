//! Single decision point for every REST handler and socket action.
//!
//! Facts (company, project, membership role) are loaded through
//! [`AccessFacts`] and handed to the pure [`decide`] / [`decide_room`]
//! functions, which perform no I/O.

mod room;

pub use room::{RoomAction, RoomFacts, RoomKey, decide_room};

use std::sync::Arc;

use async_trait::async_trait;
use bitflags::bitflags;
use bson::oid::ObjectId;
use thiserror::Error;
use worknest_db::models::{Company, Project, ProjectRole};

use crate::dao::base::DaoResult;
use crate::error::{ServiceError, ServiceResult};

bitflags! {
    /// Set of project roles a requirement accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RoleSet: u8 {
        const ADMIN = 0b001;
        const MANAGER = 0b010;
        const EMPLOYEE = 0b100;
        const LEADS = Self::ADMIN.bits() | Self::MANAGER.bits();
        const ANY = Self::LEADS.bits() | Self::EMPLOYEE.bits();
    }
}

impl From<ProjectRole> for RoleSet {
    fn from(role: ProjectRole) -> Self {
        match role {
            ProjectRole::Admin => RoleSet::ADMIN,
            ProjectRole::Manager => RoleSet::MANAGER,
            ProjectRole::Employee => RoleSet::EMPLOYEE,
        }
    }
}

impl RoleSet {
    pub fn allows(self, role: ProjectRole) -> bool {
        self.contains(RoleSet::from(role))
    }

    pub fn names(self) -> Vec<&'static str> {
        [ProjectRole::Admin, ProjectRole::Manager, ProjectRole::Employee]
            .into_iter()
            .filter(|r| self.allows(*r))
            .map(|r| r.as_str())
            .collect()
    }
}

/// The authenticated user as seen by authorization. Reloaded per request and
/// per socket join so affiliation changes take effect immediately.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: ObjectId,
    pub company_id: Option<ObjectId>,
    pub display_name: String,
}

impl Actor {
    pub fn in_company(&self, company_id: ObjectId) -> bool {
        self.company_id == Some(company_id)
    }

    pub fn require_company(&self) -> ServiceResult<ObjectId> {
        self.company_id
            .ok_or_else(|| ServiceError::Forbidden("You are not part of any company".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Read,
    Mutate,
}

#[derive(Debug, Clone)]
pub enum Requirement {
    CompanyOwner {
        company_id: ObjectId,
    },
    ProjectRole {
        project_id: ObjectId,
        roles: RoleSet,
        intent: Intent,
    },
}

#[derive(Debug, Clone)]
pub enum Grant {
    Owner { company: Company },
    Member { project: Project, role: ProjectRole },
}

/// Everything [`decide`] may look at for one requirement.
#[derive(Debug, Default)]
pub struct Facts {
    pub company: Option<Company>,
    pub project: Option<Project>,
    pub role: Option<ProjectRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Only the company owner can perform this action")]
    NotOwner,
    #[error("You are not a member of this project")]
    NotMember,
    #[error("Access denied")]
    RoleNotAllowed(RoleSet),
    #[error("Project is archived")]
    Archived,
    #[error("Not allowed in room {0}")]
    Room(String),
}

impl From<Denial> for ServiceError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::NotFound(what) => ServiceError::not_found(what),
            Denial::RoleNotAllowed(roles) => ServiceError::RoleRequired {
                allowed: roles.names(),
            },
            Denial::Archived => ServiceError::InvalidState(denial.to_string()),
            Denial::NotOwner | Denial::NotMember | Denial::Room(_) => {
                ServiceError::Forbidden(denial.to_string())
            }
        }
    }
}

/// Pure decision for one requirement. Tenancy is checked first and reports
/// foreign entities exactly like absent ones.
pub fn decide(actor: &Actor, requirement: &Requirement, facts: Facts) -> Result<Grant, Denial> {
    match requirement {
        Requirement::CompanyOwner { .. } => {
            let company = facts
                .company
                .filter(|c| c.id.is_some_and(|id| actor.in_company(id)))
                .ok_or(Denial::NotFound("Company"))?;
            if !company.is_owned_by(actor.user_id) {
                return Err(Denial::NotOwner);
            }
            Ok(Grant::Owner { company })
        }
        Requirement::ProjectRole { roles, intent, .. } => {
            let project = facts
                .project
                .filter(|p| actor.in_company(p.company_id))
                .ok_or(Denial::NotFound("Project"))?;
            let role = facts.role.ok_or(Denial::NotMember)?;
            if !roles.allows(role) {
                return Err(Denial::RoleNotAllowed(*roles));
            }
            if *intent == Intent::Mutate && project.archived {
                return Err(Denial::Archived);
            }
            Ok(Grant::Member { project, role })
        }
    }
}

#[async_trait]
pub trait AccessFacts: Send + Sync {
    async fn company(&self, company_id: ObjectId) -> DaoResult<Option<Company>>;
    async fn project(&self, project_id: ObjectId) -> DaoResult<Option<Project>>;
    async fn role(&self, user_id: ObjectId, project_id: ObjectId) -> DaoResult<Option<ProjectRole>>;
    /// Whether the user is admin or manager of any project in the company.
    async fn leads_in_company(&self, user_id: ObjectId, company_id: ObjectId) -> DaoResult<bool>;
}

#[derive(Clone)]
pub struct Authorizer {
    facts: Arc<dyn AccessFacts>,
}

impl Authorizer {
    pub fn new(facts: Arc<dyn AccessFacts>) -> Self {
        Self { facts }
    }

    pub async fn authorize(
        &self,
        actor: &Actor,
        requirement: &Requirement,
    ) -> ServiceResult<Grant> {
        let facts = match requirement {
            Requirement::CompanyOwner { company_id } => Facts {
                company: self.facts.company(*company_id).await?,
                ..Facts::default()
            },
            Requirement::ProjectRole { project_id, .. } => {
                let project = self.facts.project(*project_id).await?;
                let role = match &project {
                    Some(p) if actor.in_company(p.company_id) => {
                        self.facts.role(actor.user_id, *project_id).await?
                    }
                    _ => None,
                };
                Facts {
                    project,
                    role,
                    ..Facts::default()
                }
            }
        };

        Ok(decide(actor, requirement, facts)?)
    }

    pub async fn require_owner(
        &self,
        actor: &Actor,
        company_id: ObjectId,
    ) -> ServiceResult<Company> {
        match self
            .authorize(actor, &Requirement::CompanyOwner { company_id })
            .await?
        {
            Grant::Owner { company } => Ok(company),
            Grant::Member { .. } => Err(Denial::NotOwner.into()),
        }
    }

    /// Owner check against the actor's own company.
    pub async fn require_own_company(&self, actor: &Actor) -> ServiceResult<Company> {
        let company_id = actor.require_company()?;
        self.require_owner(actor, company_id).await
    }

    pub async fn require_project(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        roles: RoleSet,
        intent: Intent,
    ) -> ServiceResult<(Project, ProjectRole)> {
        let requirement = Requirement::ProjectRole {
            project_id,
            roles,
            intent,
        };
        match self.authorize(actor, &requirement).await? {
            Grant::Member { project, role } => Ok((project, role)),
            Grant::Owner { .. } => Err(Denial::NotMember.into()),
        }
    }

    /// Returns the company the room belongs to when the actor may perform `action`.
    pub async fn authorize_room(
        &self,
        actor: &Actor,
        room: &RoomKey,
        action: RoomAction,
    ) -> ServiceResult<ObjectId> {
        let mut facts = RoomFacts::default();
        match (room, action) {
            (RoomKey::Company(_), RoomAction::Join) => {}
            (
                RoomKey::Company(company_id) | RoomKey::Management(company_id),
                RoomAction::Moderate,
            ) => {
                if actor.in_company(*company_id) {
                    facts.company_owner =
                        self.facts.company(*company_id).await?.map(|c| c.owner_id);
                }
            }
            (RoomKey::Management(company_id), RoomAction::Join) => {
                if actor.in_company(*company_id) {
                    facts.leads_in_company = self
                        .facts
                        .leads_in_company(actor.user_id, *company_id)
                        .await?;
                }
            }
            (RoomKey::Project(project_id), _) => {
                if let Some(project) = self.facts.project(*project_id).await? {
                    if actor.in_company(project.company_id) {
                        facts.role = self.facts.role(actor.user_id, *project_id).await?;
                    }
                    facts.project_company = Some(project.company_id);
                }
            }
        }

        Ok(decide_room(actor, room, action, &facts)?)
    }
}
