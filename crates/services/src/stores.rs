use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use mongodb::Database;
use worknest_db::models::{Company, Project, ProjectRole, User};

use crate::authz::{AccessFacts, Actor};
use crate::dao::{
    DaoError, DaoResult, chat::ChatDao, company::CompanyDao, invite::InviteDao,
    membership::MembershipDao, project::ProjectDao, task::TaskDao, user::UserDao,
};

/// Every collection handle the workflows share.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<UserDao>,
    pub companies: Arc<CompanyDao>,
    pub projects: Arc<ProjectDao>,
    pub memberships: Arc<MembershipDao>,
    pub invites: Arc<InviteDao>,
    pub tasks: Arc<TaskDao>,
    pub chat: Arc<ChatDao>,
}

impl Stores {
    pub fn new(db: &Database) -> Self {
        Self {
            users: Arc::new(UserDao::new(db)),
            companies: Arc::new(CompanyDao::new(db)),
            projects: Arc::new(ProjectDao::new(db)),
            memberships: Arc::new(MembershipDao::new(db)),
            invites: Arc::new(InviteDao::new(db)),
            tasks: Arc::new(TaskDao::new(db)),
            chat: Arc::new(ChatDao::new(db)),
        }
    }

    /// Loads the user and the actor view of them. `None` if the account is gone.
    pub async fn load_actor(&self, user_id: ObjectId) -> DaoResult<Option<(User, Actor)>> {
        let user = match self.users.base.find_by_id(user_id).await {
            Ok(user) => user,
            Err(DaoError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        let actor = Actor {
            user_id,
            company_id: user.company_id,
            display_name: user.display_name().to_string(),
        };
        Ok(Some((user, actor)))
    }
}

#[async_trait]
impl AccessFacts for Stores {
    async fn company(&self, company_id: ObjectId) -> DaoResult<Option<Company>> {
        self.companies.find(company_id).await
    }

    async fn project(&self, project_id: ObjectId) -> DaoResult<Option<Project>> {
        self.projects.find(project_id).await
    }

    async fn role(
        &self,
        user_id: ObjectId,
        project_id: ObjectId,
    ) -> DaoResult<Option<ProjectRole>> {
        self.memberships.get_role(user_id, project_id).await
    }

    async fn leads_in_company(&self, user_id: ObjectId, company_id: ObjectId) -> DaoResult<bool> {
        self.memberships.leads_in_company(user_id, company_id).await
    }
}
