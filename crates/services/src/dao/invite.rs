use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use worknest_db::models::{InviteStatus, ProjectInvite};

use super::base::{BaseDao, DaoResult, PaginationParams};

pub struct InviteDao {
    pub base: BaseDao<ProjectInvite>,
}

impl InviteDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, ProjectInvite::COLLECTION),
        }
    }

    /// A second pending invite for the same (project, invitee) fails with
    /// `DaoError::DuplicateKey` through the partial unique index.
    pub async fn create(
        &self,
        company_id: ObjectId,
        project_id: ObjectId,
        inviter_id: ObjectId,
        invitee_id: ObjectId,
    ) -> DaoResult<ProjectInvite> {
        let now = DateTime::now();
        let invite = ProjectInvite {
            id: None,
            company_id,
            project_id,
            inviter_id,
            invitee_id,
            status: InviteStatus::Pending,
            reason: None,
            responded_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&invite).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find(&self, invite_id: ObjectId) -> DaoResult<Option<ProjectInvite>> {
        self.base.find_one(doc! { "_id": invite_id }).await
    }

    /// Most recent invite for (project, invitee), whatever its status. While
    /// one is pending it is always the latest.
    pub async fn latest_for(
        &self,
        project_id: ObjectId,
        invitee_id: ObjectId,
    ) -> DaoResult<Option<ProjectInvite>> {
        let newest = PaginationParams {
            page: 1,
            per_page: 1,
        };
        let page = self
            .base
            .find_paginated(
                doc! { "project_id": project_id, "invitee_id": invitee_id },
                Some(doc! { "created_at": -1, "_id": -1 }),
                &newest,
            )
            .await?;
        Ok(page.items.into_iter().next())
    }

    pub async fn pending_for(&self, invitee_id: ObjectId) -> DaoResult<Vec<ProjectInvite>> {
        self.base
            .find_many(
                doc! { "invitee_id": invitee_id, "status": InviteStatus::Pending.as_str() },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }

    /// Compare-and-swap out of `pending`. Returns false when another
    /// response already won.
    pub async fn transition(
        &self,
        invite_id: ObjectId,
        to: InviteStatus,
        reason: Option<String>,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": invite_id, "status": InviteStatus::Pending.as_str() },
                doc! {
                    "$set": {
                        "status": to.as_str(),
                        "reason": reason,
                        "responded_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    /// Drops pending invites the user sent or received inside the company.
    pub async fn delete_pending_for_user(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> DaoResult<u64> {
        self.base
            .hard_delete(doc! {
                "company_id": company_id,
                "status": InviteStatus::Pending.as_str(),
                "$or": [ { "invitee_id": user_id }, { "inviter_id": user_id } ],
            })
            .await
    }
}
