use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use worknest_db::models::Project;

use super::base::{BaseDao, DaoResult};

pub struct ProjectDao {
    pub base: BaseDao<Project>,
}

impl ProjectDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Project::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        company_id: ObjectId,
        name: String,
        description: Option<String>,
        manager_id: ObjectId,
    ) -> DaoResult<Project> {
        let now = DateTime::now();
        let project = Project {
            id: None,
            name,
            company_id,
            manager_id,
            description,
            archived: false,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&project).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find(&self, project_id: ObjectId) -> DaoResult<Option<Project>> {
        self.base.find_one(doc! { "_id": project_id }).await
    }

    pub async fn list_in_company(
        &self,
        company_id: ObjectId,
        archived: bool,
    ) -> DaoResult<Vec<Project>> {
        self.base
            .find_many(
                doc! { "company_id": company_id, "archived": archived },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }

    pub async fn find_many_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Project>> {
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, Some(doc! { "name": 1 }))
            .await
    }

    /// Ids among `ids` whose project is not archived.
    pub async fn active_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<ObjectId>> {
        let projects = self
            .base
            .find_many(
                doc! { "_id": { "$in": ids.to_vec() }, "archived": false },
                Some(doc! { "_id": 1 }),
            )
            .await?;
        Ok(projects.into_iter().filter_map(|p| p.id).collect())
    }

    pub async fn set_archived(&self, project_id: ObjectId, archived: bool) -> DaoResult<bool> {
        self.base
            .update_by_id(project_id, doc! { "$set": { "archived": archived } })
            .await
    }

    pub async fn set_manager(&self, project_id: ObjectId, manager_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(project_id, doc! { "$set": { "manager_id": manager_id } })
            .await
    }

    pub async fn delete(&self, project_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "_id": project_id }).await
    }
}
