use bson::{doc, oid::ObjectId};
use tracing::{info, warn};
use worknest_db::models::{Project, ProjectRole, User};

use crate::authz::{Actor, Authorizer, Intent, RoleSet};
use crate::dao::persisted;
use crate::error::{ServiceError, ServiceResult};
use crate::stores::Stores;

pub struct ProjectService {
    stores: Stores,
    authz: Authorizer,
}

impl ProjectService {
    pub fn new(stores: Stores, authz: Authorizer) -> Self {
        Self { stores, authz }
    }

    async fn company_user(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        what: &str,
    ) -> ServiceResult<User> {
        self.stores
            .users
            .base
            .find_one(doc! { "_id": user_id, "company_id": company_id })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{what} not found in this company")))
    }

    /// Owner creates a project; the owner becomes its admin and `manager_id`
    /// its manager.
    pub async fn create(
        &self,
        actor: &Actor,
        name: &str,
        description: Option<String>,
        manager_id: ObjectId,
    ) -> ServiceResult<Project> {
        let company = self.authz.require_own_company(actor).await?;
        let company_id = persisted(company.id)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("Project name is required".to_string()));
        }
        if manager_id == actor.user_id {
            return Err(ServiceError::BadRequest(
                "The company owner is already the project admin".to_string(),
            ));
        }
        self.company_user(company_id, manager_id, "Manager").await?;

        let project = self
            .stores
            .projects
            .create(company_id, name.to_string(), description, manager_id)
            .await
            .map_err(ServiceError::on_duplicate(
                "A project with this name already exists in your company",
            ))?;
        let project_id = persisted(project.id)?;

        let seeded = async {
            self.stores
                .memberships
                .insert(actor.user_id, project_id, company_id, ProjectRole::Admin)
                .await?;
            self.stores
                .memberships
                .insert(manager_id, project_id, company_id, ProjectRole::Manager)
                .await
        }
        .await;

        if let Err(e) = seeded {
            warn!(%project_id, %e, "Seeding project roles failed, rolling back");
            self.stores.memberships.remove_project(project_id).await?;
            self.stores.projects.delete(project_id).await?;
            return Err(e.into());
        }

        info!(%project_id, %company_id, manager = %manager_id, "Project created");
        Ok(project)
    }

    pub async fn list(&self, actor: &Actor, archived: bool) -> ServiceResult<Vec<Project>> {
        let company = self.authz.require_own_company(actor).await?;
        Ok(self
            .stores
            .projects
            .list_in_company(persisted(company.id)?, archived)
            .await?)
    }

    pub async fn set_archived(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        archived: bool,
    ) -> ServiceResult<Project> {
        let company = self.authz.require_own_company(actor).await?;
        let project = self
            .stores
            .projects
            .find(project_id)
            .await?
            .filter(|p| Some(p.company_id) == company.id)
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        self.stores.projects.set_archived(project_id, archived).await?;
        info!(%project_id, archived, "Project archive flag changed");
        Ok(Project { archived, ..project })
    }

    pub async fn add_employee(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> ServiceResult<()> {
        let (project, _) = self
            .authz
            .require_project(actor, project_id, RoleSet::LEADS, Intent::Mutate)
            .await?;
        self.company_user(project.company_id, user_id, "User").await?;

        self.stores
            .memberships
            .insert(user_id, project_id, project.company_id, ProjectRole::Employee)
            .await
            .map_err(ServiceError::on_duplicate("User is already a member of this project"))?;

        info!(%project_id, user = %user_id, "Employee added to project");
        Ok(())
    }

    /// Idempotent: removing someone who is not a member reports 0.
    pub async fn remove_employee(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> ServiceResult<u64> {
        self.authz
            .require_project(actor, project_id, RoleSet::LEADS, Intent::Mutate)
            .await?;

        match self.stores.memberships.get_role(user_id, project_id).await? {
            None => Ok(0),
            Some(ProjectRole::Employee) => {
                let removed = self
                    .stores
                    .memberships
                    .remove_with_role(user_id, project_id, ProjectRole::Employee)
                    .await?;
                info!(%project_id, user = %user_id, removed, "Employee removed from project");
                Ok(removed)
            }
            Some(role) => Err(ServiceError::Forbidden(format!(
                "Cannot remove the project {role} this way"
            ))),
        }
    }

    pub async fn employees(&self, actor: &Actor, project_id: ObjectId) -> ServiceResult<Vec<User>> {
        let (project, _) = self
            .authz
            .require_project(actor, project_id, RoleSet::LEADS, Intent::Read)
            .await?;
        let ids: Vec<ObjectId> = self
            .stores
            .memberships
            .members_with_role(project_id, ProjectRole::Employee)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        Ok(self.stores.users.find_in_company(project.company_id, &ids).await?)
    }

    /// Project admin hands the manager role to `new_manager_id`; the previous
    /// manager stays on as an employee.
    pub async fn reassign_manager(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        new_manager_id: ObjectId,
    ) -> ServiceResult<Project> {
        let (project, _) = self
            .authz
            .require_project(actor, project_id, RoleSet::ADMIN, Intent::Mutate)
            .await?;
        self.company_user(project.company_id, new_manager_id, "Manager")
            .await?;

        if project.manager_id == new_manager_id {
            return Ok(project);
        }

        match self
            .stores
            .memberships
            .get_role(new_manager_id, project_id)
            .await?
        {
            Some(ProjectRole::Admin) => {
                return Err(ServiceError::Conflict(
                    "The project admin cannot also be its manager".to_string(),
                ));
            }
            Some(_) => {
                self.stores
                    .memberships
                    .reassign(new_manager_id, project_id, ProjectRole::Manager)
                    .await?;
            }
            None => {
                self.stores
                    .memberships
                    .insert(new_manager_id, project_id, project.company_id, ProjectRole::Manager)
                    .await
                    .map_err(ServiceError::on_duplicate("Membership changed concurrently"))?;
            }
        }

        self.stores
            .memberships
            .reassign(project.manager_id, project_id, ProjectRole::Employee)
            .await?;
        self.stores
            .projects
            .set_manager(project_id, new_manager_id)
            .await?;

        info!(
            %project_id,
            previous = %project.manager_id,
            manager = %new_manager_id,
            "Project manager reassigned"
        );
        Ok(Project {
            manager_id: new_manager_id,
            ..project
        })
    }

    /// Projects in which the actor holds `role`.
    pub async fn my_projects(
        &self,
        actor: &Actor,
        role: ProjectRole,
    ) -> ServiceResult<Vec<Project>> {
        let company_id = actor.require_company()?;
        let ids = self
            .stores
            .memberships
            .projects_with_role(actor.user_id, company_id, role)
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.stores.projects.find_many_by_ids(&ids).await?)
    }
}
