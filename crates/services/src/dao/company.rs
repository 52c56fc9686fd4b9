use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use worknest_db::models::Company;

use super::base::{BaseDao, DaoResult};

pub struct CompanyDao {
    pub base: BaseDao<Company>,
}

impl CompanyDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Company::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        owner_id: ObjectId,
    ) -> DaoResult<Company> {
        let now = DateTime::now();
        let company = Company {
            id: None,
            name,
            description,
            owner_id,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&company).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find(&self, company_id: ObjectId) -> DaoResult<Option<Company>> {
        self.base.find_one(doc! { "_id": company_id }).await
    }

    /// Only used to roll back a creation whose owner affiliation failed.
    pub async fn delete(&self, company_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "_id": company_id }).await
    }
}
