use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use mongodb::Database;
use worknest_db::models::{Task, TaskStatus};

use super::base::{BaseDao, DaoResult};

pub struct TaskDao {
    pub base: BaseDao<Task>,
}

impl TaskDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Task::COLLECTION),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        project_id: ObjectId,
        task_name: String,
        description: Option<String>,
        assigned_to: ObjectId,
        assigned_by: ObjectId,
        due_date: Option<DateTime>,
        file_url: Option<String>,
    ) -> DaoResult<Task> {
        let now = DateTime::now();
        let task = Task {
            id: None,
            project_id,
            task_name,
            description,
            assigned_to,
            assigned_by,
            status: TaskStatus::Pending,
            due_date,
            completed_at: None,
            file_url,
            submission_url: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&task).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find(&self, task_id: ObjectId) -> DaoResult<Option<Task>> {
        self.base.find_one(doc! { "_id": task_id }).await
    }

    /// Applies `set` only while the task is not completed. Returns whether
    /// the write happened.
    pub async fn update_unless_completed(
        &self,
        task_id: ObjectId,
        set: Document,
    ) -> DaoResult<bool> {
        self.update_where_status(task_id, not_completed(), set).await
    }

    /// Applies `set` only while the task's status satisfies `status`, a bson
    /// value or operator document. Returns whether the write happened.
    pub async fn update_where_status(
        &self,
        task_id: ObjectId,
        status: Bson,
        set: Document,
    ) -> DaoResult<bool> {
        self.base
            .update_one(doc! { "_id": task_id, "status": status }, doc! { "$set": set })
            .await
    }

    pub async fn for_project(&self, project_id: ObjectId) -> DaoResult<Vec<Task>> {
        self.base
            .find_many(
                doc! { "project_id": project_id },
                Some(doc! { "due_date": 1, "created_at": 1 }),
            )
            .await
    }

    pub async fn for_assignee(
        &self,
        project_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Vec<Task>> {
        self.base
            .find_many(
                doc! { "project_id": project_id, "assigned_to": user_id },
                Some(doc! { "due_date": 1, "created_at": 1 }),
            )
            .await
    }

    pub async fn delete(&self, task_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "_id": task_id }).await
    }

    /// Promotes every task past its due date that is neither completed nor
    /// already overdue. Returns the number of tasks changed.
    pub async fn mark_overdue(&self, now: DateTime) -> DaoResult<u64> {
        self.base
            .update_many(
                doc! {
                    "due_date": { "$lt": now },
                    "status": {
                        "$nin": [TaskStatus::Completed.as_str(), TaskStatus::Overdue.as_str()]
                    },
                },
                doc! { "$set": { "status": TaskStatus::Overdue.as_str() } },
            )
            .await
    }
}

fn not_completed() -> Bson {
    Bson::Document(doc! { "$ne": TaskStatus::Completed.as_str() })
}
