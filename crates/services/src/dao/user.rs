use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use worknest_db::models::User;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        username: String,
        full_name: String,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email,
            username,
            full_name,
            password_hash: Some(password_hash),
            company_id: None,
            profile_picture_url: None,
            phone: None,
            bio: None,
            skills: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "username": username })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Affiliates the user with `company_id` unless they already belong to one.
    pub async fn set_company_if_unset(
        &self,
        user_id: ObjectId,
        company_id: ObjectId,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": user_id, "company_id": null },
                doc! { "$set": { "company_id": company_id } },
            )
            .await
    }

    /// Detaches the user from `company_id`; a no-op if they moved elsewhere.
    pub async fn clear_company(&self, user_id: ObjectId, company_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": user_id, "company_id": company_id },
                doc! { "$set": { "company_id": null } },
            )
            .await
    }

    pub async fn update_password(
        &self,
        user_id: ObjectId,
        password_hash: String,
    ) -> DaoResult<bool> {
        self.base
            .update_by_id(user_id, doc! { "$set": { "password_hash": password_hash } })
            .await
    }

    /// Sets the profile fields that are present. Returns false when there
    /// was nothing to write.
    pub async fn update_profile(
        &self,
        user_id: ObjectId,
        full_name: Option<String>,
        profile_picture_url: Option<String>,
        phone: Option<String>,
        bio: Option<String>,
        skills: Option<Vec<String>>,
    ) -> DaoResult<bool> {
        let mut update = bson::Document::new();
        if let Some(name) = full_name {
            update.insert("full_name", name);
        }
        if let Some(url) = profile_picture_url {
            update.insert("profile_picture_url", url);
        }
        if let Some(phone) = phone {
            update.insert("phone", phone);
        }
        if let Some(bio) = bio {
            update.insert("bio", bio);
        }
        if let Some(skills) = skills {
            update.insert("skills", skills);
        }

        if update.is_empty() {
            return Ok(false);
        }

        self.base
            .update_by_id(user_id, doc! { "$set": update })
            .await
    }

    pub async fn find_in_company(
        &self,
        company_id: ObjectId,
        ids: &[ObjectId],
    ) -> DaoResult<Vec<User>> {
        self.base
            .find_many(
                doc! { "_id": { "$in": ids.to_vec() }, "company_id": company_id },
                Some(doc! { "full_name": 1 }),
            )
            .await
    }
}
