use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use tracing::{info, warn};
use worknest_db::models::{InviteStatus, ProjectInvite, ProjectRole};

use crate::auth::{AuthService, LinkKind};
use crate::authz::{Actor, Authorizer, Intent, RoleSet};
use crate::dao::persisted;
use crate::error::{ServiceError, ServiceResult};
use crate::stores::Stores;

#[derive(Debug, Clone)]
pub enum InviteResponse {
    Accept,
    Reject { reason: String },
}

/// How the invitee addresses the invite they are answering.
#[derive(Debug, Clone)]
pub enum InviteRef {
    Id(ObjectId),
    Token(String),
}

/// Status an invite moves to when `response` is applied in `current`.
pub fn next_status(
    current: InviteStatus,
    response: &InviteResponse,
) -> ServiceResult<InviteStatus> {
    if let InviteResponse::Reject { reason } = response {
        if reason.trim().is_empty() {
            return Err(ServiceError::BadRequest(
                "A reason is required to reject an invite".to_string(),
            ));
        }
    }
    if current.is_terminal() {
        return Err(ServiceError::InvalidState(format!(
            "Invite has already been {}",
            current.as_str()
        )));
    }
    Ok(match response {
        InviteResponse::Accept => InviteStatus::Accepted,
        InviteResponse::Reject { .. } => InviteStatus::Rejected,
    })
}

pub struct InviteWorkflow {
    stores: Stores,
    authz: Authorizer,
    auth: Arc<AuthService>,
}

impl InviteWorkflow {
    pub fn new(stores: Stores, authz: Authorizer, auth: Arc<AuthService>) -> Self {
        Self { stores, authz, auth }
    }

    /// Creates a pending invite and the signed join link for the invitee.
    pub async fn create(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        invitee_id: ObjectId,
    ) -> ServiceResult<(ProjectInvite, String)> {
        let (project, _) = self
            .authz
            .require_project(actor, project_id, RoleSet::LEADS, Intent::Mutate)
            .await?;

        self.stores
            .users
            .base
            .find_one(doc! { "_id": invitee_id, "company_id": project.company_id })
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found in this company".to_string()))?;

        if self
            .stores
            .memberships
            .get_role(invitee_id, project_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "User is already a member of this project".to_string(),
            ));
        }

        let invite = self
            .stores
            .invites
            .create(project.company_id, project_id, actor.user_id, invitee_id)
            .await
            .map_err(ServiceError::on_duplicate(
                "An invite is already pending for this user",
            ))?;

        let token = self
            .auth
            .issue_link(LinkKind::ProjectJoin, project_id, Some(invitee_id))?;

        info!(invite = ?invite.id, %project_id, invitee = %invitee_id, "Project invite created");
        Ok((invite, token))
    }

    async fn resolve(&self, actor: &Actor, target: &InviteRef) -> ServiceResult<ProjectInvite> {
        let invite = match target {
            InviteRef::Id(id) => self.stores.invites.find(*id).await?,
            InviteRef::Token(token) => {
                let invalid =
                    || ServiceError::BadRequest("Invalid or expired invite link".to_string());
                let claims = self
                    .auth
                    .verify_link(token, LinkKind::ProjectJoin)
                    .map_err(|_| invalid())?;
                if claims.subject_id().map_err(|_| invalid())? != Some(actor.user_id) {
                    return Err(ServiceError::Forbidden(
                        "This invite link belongs to another user".to_string(),
                    ));
                }
                let project_id = claims.target_id().map_err(|_| invalid())?;
                self.stores
                    .invites
                    .latest_for(project_id, actor.user_id)
                    .await?
            }
        };

        let invite = invite
            .filter(|i| actor.in_company(i.company_id))
            .ok_or_else(|| ServiceError::not_found("Invite"))?;
        if invite.invitee_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the invitee can respond to this invite".to_string(),
            ));
        }
        Ok(invite)
    }

    /// Accept or reject. Accepting creates the employee membership and flips
    /// the invite in that order; a lost race undoes the membership.
    pub async fn respond(
        &self,
        actor: &Actor,
        target: InviteRef,
        response: InviteResponse,
    ) -> ServiceResult<ProjectInvite> {
        let invite = self.resolve(actor, &target).await?;
        let invite_id = persisted(invite.id)?;
        let next = next_status(invite.status, &response)?;

        match response {
            InviteResponse::Accept => {
                let project = self
                    .stores
                    .projects
                    .find(invite.project_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Project"))?;
                if project.archived {
                    return Err(ServiceError::InvalidState("Project is archived".to_string()));
                }

                self.stores
                    .memberships
                    .insert(
                        actor.user_id,
                        invite.project_id,
                        invite.company_id,
                        ProjectRole::Employee,
                    )
                    .await
                    .map_err(ServiceError::on_duplicate(
                        "You are already a member of this project",
                    ))?;

                if !self.stores.invites.transition(invite_id, next, None).await? {
                    warn!(%invite_id, "Invite answered concurrently, undoing membership");
                    self.stores
                        .memberships
                        .remove(actor.user_id, invite.project_id)
                        .await?;
                    return Err(ServiceError::InvalidState(
                        "Invite has already been answered".to_string(),
                    ));
                }
            }
            InviteResponse::Reject { reason } => {
                let reason = reason.trim().to_string();
                if !self
                    .stores
                    .invites
                    .transition(invite_id, next, Some(reason))
                    .await?
                {
                    return Err(ServiceError::InvalidState(
                        "Invite has already been answered".to_string(),
                    ));
                }
            }
        }

        info!(%invite_id, status = next.as_str(), user = %actor.user_id, "Invite answered");
        self.stores
            .invites
            .find(invite_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invite"))
    }

    pub async fn pending_for(&self, actor: &Actor) -> ServiceResult<Vec<ProjectInvite>> {
        let company_id = actor.require_company()?;
        let invites = self.stores.invites.pending_for(actor.user_id).await?;
        Ok(invites
            .into_iter()
            .filter(|i| i.company_id == company_id)
            .collect())
    }
}
