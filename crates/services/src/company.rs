use std::sync::Arc;

use bson::oid::ObjectId;
use serde::Serialize;
use tracing::{error, info, warn};
use worknest_db::models::Company;

use crate::auth::{AuthService, LinkKind};
use crate::authz::{Actor, Authorizer};
use crate::dao::persisted;
use crate::error::{ServiceError, ServiceResult};
use crate::stores::Stores;

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub company: Company,
    pub already_member: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RemovalReport {
    pub memberships_removed: u64,
    pub invites_removed: u64,
}

pub struct CompanyService {
    stores: Stores,
    authz: Authorizer,
    auth: Arc<AuthService>,
}

impl CompanyService {
    pub fn new(stores: Stores, authz: Authorizer, auth: Arc<AuthService>) -> Self {
        Self { stores, authz, auth }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
    ) -> ServiceResult<Company> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("Company name is required".to_string()));
        }
        if actor.company_id.is_some() {
            return Err(ServiceError::Conflict("You already belong to a company".to_string()));
        }

        let company = self
            .stores
            .companies
            .create(name.to_string(), description, actor.user_id)
            .await
            .map_err(ServiceError::on_duplicate("Company name is already taken"))?;
        let company_id = persisted(company.id)?;

        if !self
            .stores
            .users
            .set_company_if_unset(actor.user_id, company_id)
            .await?
        {
            // Joined another company while this one was being created.
            self.stores.companies.delete(company_id).await?;
            return Err(ServiceError::Conflict("You already belong to a company".to_string()));
        }

        info!(%company_id, owner = %actor.user_id, "Company created");
        Ok(company)
    }

    pub async fn get(&self, actor: &Actor) -> ServiceResult<Company> {
        let company_id = actor.require_company()?;
        self.stores
            .companies
            .find(company_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Company"))
    }

    /// Signed link anyone can use to join the owner's company.
    pub async fn invite_link(&self, actor: &Actor) -> ServiceResult<(Company, String)> {
        let company = self.authz.require_own_company(actor).await?;
        let token = self
            .auth
            .issue_link(LinkKind::CompanyInvite, persisted(company.id)?, None)?;
        Ok((company, token))
    }

    pub async fn join(&self, actor: &Actor, token: &str) -> ServiceResult<JoinOutcome> {
        let invalid = || ServiceError::BadRequest("Invalid or expired invite link".to_string());
        let claims = self
            .auth
            .verify_link(token, LinkKind::CompanyInvite)
            .map_err(|_| invalid())?;
        let company_id = claims.target_id().map_err(|_| invalid())?;
        let company = self
            .stores
            .companies
            .find(company_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Company"))?;

        match actor.company_id {
            Some(current) if current == company_id => {
                return Ok(JoinOutcome {
                    company,
                    already_member: true,
                });
            }
            Some(_) => {
                return Err(ServiceError::Conflict(
                    "You already belong to another company".to_string(),
                ));
            }
            None => {}
        }

        if !self
            .stores
            .users
            .set_company_if_unset(actor.user_id, company_id)
            .await?
        {
            let user = self.stores.users.base.find_by_id(actor.user_id).await?;
            if user.company_id != Some(company_id) {
                return Err(ServiceError::Conflict(
                    "You already belong to another company".to_string(),
                ));
            }
            return Ok(JoinOutcome {
                company,
                already_member: true,
            });
        }

        info!(%company_id, user = %actor.user_id, "User joined company");
        Ok(JoinOutcome {
            company,
            already_member: false,
        })
    }

    /// Non-archived projects in the company that `user_id` leads.
    async fn blocking_projects(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> ServiceResult<Vec<ObjectId>> {
        let leading = self
            .stores
            .memberships
            .leading_projects(user_id, company_id)
            .await?;
        if leading.is_empty() {
            return Ok(leading);
        }
        Ok(self.stores.projects.active_ids(&leading).await?)
    }

    /// Removes `user_id` from the owner's company. The affiliation is cleared
    /// first, which makes every membership of the user inert for other
    /// observers before the rows themselves are deleted.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        user_id: ObjectId,
    ) -> ServiceResult<RemovalReport> {
        let company = self.authz.require_own_company(actor).await?;
        let company_id = persisted(company.id)?;

        let target = self
            .stores
            .users
            .base
            .find_one(bson::doc! { "_id": user_id, "company_id": company_id })
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found in your company".to_string()))?;

        if company.is_owned_by(user_id) {
            return Err(ServiceError::Forbidden(
                "The company owner cannot be removed".to_string(),
            ));
        }

        let blocking = self.blocking_projects(user_id, company_id).await?;
        if !blocking.is_empty() {
            return Err(ServiceError::RemovalBlocked {
                project_ids: blocking,
            });
        }

        if !self.stores.users.clear_company(user_id, company_id).await? {
            return Err(ServiceError::NotFound("User not found in your company".to_string()));
        }

        // A lead role granted between the check and the detach wins.
        let blocking = match self.blocking_projects(user_id, company_id).await {
            Ok(blocking) => blocking,
            Err(e) => return Err(self.restore_affiliation(user_id, company_id, e).await),
        };
        if !blocking.is_empty() {
            warn!(%company_id, user = %user_id, "Member gained a lead role during removal");
            let blocked = ServiceError::RemovalBlocked {
                project_ids: blocking,
            };
            return Err(self.restore_affiliation(user_id, company_id, blocked).await);
        }

        let (memberships_removed, invites_removed) =
            match self.cascade_removal(user_id, company_id).await {
                Ok(counts) => counts,
                Err(e) => return Err(self.restore_affiliation(user_id, company_id, e).await),
            };

        info!(
            %company_id,
            user = %user_id,
            username = %target.username,
            memberships_removed,
            invites_removed,
            "Member removed from company"
        );

        Ok(RemovalReport {
            memberships_removed,
            invites_removed,
        })
    }

    async fn cascade_removal(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> ServiceResult<(u64, u64)> {
        let memberships = self
            .stores
            .memberships
            .remove_in_company(user_id, company_id)
            .await?;
        let invites = self
            .stores
            .invites
            .delete_pending_for_user(user_id, company_id)
            .await?;
        Ok((memberships, invites))
    }

    /// Re-attaches a detached member after a failed removal and hands back
    /// `cause` for the caller to return.
    async fn restore_affiliation(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
        cause: ServiceError,
    ) -> ServiceError {
        match self.stores.users.set_company_if_unset(user_id, company_id).await {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    %company_id,
                    user = %user_id,
                    %cause,
                    "Affiliation not restored, user already re-affiliated"
                );
            }
            Err(e) => {
                error!(%company_id, user = %user_id, %cause, %e, "Affiliation restore failed");
            }
        }
        cause
    }
}
