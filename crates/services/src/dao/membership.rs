use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use worknest_db::models::{Membership, ProjectRole};

use super::base::{BaseDao, DaoResult};

/// The membership registry: authoritative (user, project) → role mapping.
pub struct MembershipDao {
    pub base: BaseDao<Membership>,
}

impl MembershipDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Membership::COLLECTION),
        }
    }

    pub async fn get(
        &self,
        user_id: ObjectId,
        project_id: ObjectId,
    ) -> DaoResult<Option<Membership>> {
        self.base
            .find_one(doc! { "user_id": user_id, "project_id": project_id })
            .await
    }

    pub async fn get_role(
        &self,
        user_id: ObjectId,
        project_id: ObjectId,
    ) -> DaoResult<Option<ProjectRole>> {
        Ok(self.get(user_id, project_id).await?.map(|m| m.role))
    }

    /// Insert-if-absent. An existing row for the pair fails with
    /// `DaoError::DuplicateKey` through the unique index; roles are never
    /// replaced here.
    pub async fn insert(
        &self,
        user_id: ObjectId,
        project_id: ObjectId,
        company_id: ObjectId,
        role: ProjectRole,
    ) -> DaoResult<ObjectId> {
        let now = DateTime::now();
        let membership = Membership {
            id: None,
            user_id,
            project_id,
            company_id,
            role,
            created_at: now,
            updated_at: now,
        };
        self.base.insert_one(&membership).await
    }

    /// Explicit role change. Returns whether a membership existed.
    pub async fn reassign(
        &self,
        user_id: ObjectId,
        project_id: ObjectId,
        role: ProjectRole,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "user_id": user_id, "project_id": project_id },
                doc! { "$set": { "role": role.as_str() } },
            )
            .await
    }

    /// Idempotent; returns how many rows were removed (0 or 1).
    pub async fn remove(&self, user_id: ObjectId, project_id: ObjectId) -> DaoResult<u64> {
        self.base
            .hard_delete(doc! { "user_id": user_id, "project_id": project_id })
            .await
    }

    /// Removes only a row that still carries `role`.
    pub async fn remove_with_role(
        &self,
        user_id: ObjectId,
        project_id: ObjectId,
        role: ProjectRole,
    ) -> DaoResult<u64> {
        self.base
            .hard_delete(doc! {
                "user_id": user_id,
                "project_id": project_id,
                "role": role.as_str(),
            })
            .await
    }

    pub async fn remove_in_company(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> DaoResult<u64> {
        self.base
            .hard_delete(doc! { "user_id": user_id, "company_id": company_id })
            .await
    }

    pub async fn remove_project(&self, project_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "project_id": project_id }).await
    }

    /// Project ids in `company_id` where the user is admin or manager.
    pub async fn leading_projects(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> DaoResult<Vec<ObjectId>> {
        let rows = self
            .base
            .find_many(
                doc! {
                    "user_id": user_id,
                    "company_id": company_id,
                    "role": { "$in": ["admin", "manager"] },
                },
                None,
            )
            .await?;
        Ok(rows.into_iter().map(|m| m.project_id).collect())
    }

    pub async fn projects_with_role(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
        role: ProjectRole,
    ) -> DaoResult<Vec<ObjectId>> {
        let rows = self
            .base
            .find_many(
                doc! { "user_id": user_id, "company_id": company_id, "role": role.as_str() },
                None,
            )
            .await?;
        Ok(rows.into_iter().map(|m| m.project_id).collect())
    }

    pub async fn for_user(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> DaoResult<Vec<Membership>> {
        self.base
            .find_many(
                doc! { "user_id": user_id, "company_id": company_id },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    pub async fn members_with_role(
        &self,
        project_id: ObjectId,
        role: ProjectRole,
    ) -> DaoResult<Vec<Membership>> {
        self.base
            .find_many(
                doc! { "project_id": project_id, "role": role.as_str() },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    pub async fn leads_in_company(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! {
                "user_id": user_id,
                "company_id": company_id,
                "role": { "$in": ["admin", "manager"] },
            })
            .await?;
        Ok(count > 0)
    }
}
