use bson::{doc, oid::ObjectId, DateTime, Document};
use tracing::info;
use worknest_db::models::{ProjectRole, Task, TaskStatus};

use crate::authz::{Actor, Authorizer, Intent, RoleSet};
use crate::error::{ServiceError, ServiceResult};
use crate::stores::Stores;

#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_name: String,
    pub description: Option<String>,
    pub assigned_to: ObjectId,
    pub due_date: Option<DateTime>,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime>,
    pub assigned_to: Option<ObjectId>,
    pub file_url: Option<String>,
}

impl TaskEdit {
    /// Whether the edit touches fields frozen by completion.
    pub fn touches_schedule(&self) -> bool {
        self.due_date.is_some() || self.assigned_to.is_some()
    }

    /// `$set` body for this edit applied to `task` at `now`.
    fn to_set(&self, task: &Task, now: DateTime) -> ServiceResult<Document> {
        let mut set = Document::new();
        if let Some(name) = &self.task_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ServiceError::BadRequest("Task name cannot be empty".to_string()));
            }
            set.insert("task_name", name);
        }
        if let Some(description) = &self.description {
            set.insert("description", description.as_str());
        }
        if let Some(file_url) = &self.file_url {
            set.insert("file_url", file_url.as_str());
        }
        if let Some(assignee) = self.assigned_to {
            set.insert("assigned_to", assignee);
        }
        if let Some(due_date) = self.due_date {
            set.insert("due_date", due_date);
            if task.status == TaskStatus::Overdue && due_date > now {
                set.insert("status", TaskStatus::Pending.as_str());
            }
        }
        Ok(set)
    }
}

/// Guards a manager's edit against the task's current state.
pub fn check_edit(task: &Task, edit: &TaskEdit) -> ServiceResult<()> {
    if task.is_completed() && edit.touches_schedule() {
        return Err(ServiceError::InvalidState(
            "Cannot change the due date or assignee of a completed task".to_string(),
        ));
    }
    Ok(())
}

/// Guards an assignee's status update.
pub fn check_response(task: &Task, status: TaskStatus) -> ServiceResult<()> {
    if !matches!(status, TaskStatus::InProgress | TaskStatus::Completed) {
        return Err(ServiceError::BadRequest(
            "Status must be in-progress or completed".to_string(),
        ));
    }
    if task.is_completed() {
        return Err(ServiceError::InvalidState("Task is already completed".to_string()));
    }
    Ok(())
}

pub struct TaskLifecycle {
    stores: Stores,
    authz: Authorizer,
}

impl TaskLifecycle {
    pub fn new(stores: Stores, authz: Authorizer) -> Self {
        Self { stores, authz }
    }

    /// Loads the task and authorizes against its project. A task in a
    /// foreign project is reported as missing.
    async fn task_for(
        &self,
        actor: &Actor,
        task_id: ObjectId,
        roles: RoleSet,
        intent: Intent,
    ) -> ServiceResult<(Task, ProjectRole)> {
        let task = self
            .stores
            .tasks
            .find(task_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))?;
        let (_, role) = self
            .authz
            .require_project(actor, task.project_id, roles, intent)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => ServiceError::not_found("Task"),
                other => other,
            })?;
        Ok((task, role))
    }

    async fn require_employee(&self, user_id: ObjectId, project_id: ObjectId) -> ServiceResult<()> {
        match self.stores.memberships.get_role(user_id, project_id).await? {
            Some(ProjectRole::Employee) => Ok(()),
            _ => Err(ServiceError::NotFound(
                "Assignee is not an employee of this project".to_string(),
            )),
        }
    }

    async fn reload(&self, task_id: ObjectId) -> ServiceResult<Task> {
        self.stores
            .tasks
            .find(task_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task"))
    }

    pub async fn assign(
        &self,
        actor: &Actor,
        project_id: ObjectId,
        new: NewTask,
    ) -> ServiceResult<Task> {
        self.authz
            .require_project(actor, project_id, RoleSet::LEADS, Intent::Mutate)
            .await?;

        let task_name = new.task_name.trim();
        if task_name.is_empty() {
            return Err(ServiceError::BadRequest("Task name is required".to_string()));
        }
        self.require_employee(new.assigned_to, project_id).await?;

        let task = self
            .stores
            .tasks
            .create(
                project_id,
                task_name.to_string(),
                new.description,
                new.assigned_to,
                actor.user_id,
                new.due_date,
                new.file_url,
            )
            .await?;

        info!(task = ?task.id, %project_id, assignee = %new.assigned_to, "Task assigned");
        Ok(task)
    }

    pub async fn edit(
        &self,
        actor: &Actor,
        task_id: ObjectId,
        edit: TaskEdit,
    ) -> ServiceResult<Task> {
        let (task, _) = self
            .task_for(actor, task_id, RoleSet::LEADS, Intent::Mutate)
            .await?;
        check_edit(&task, &edit)?;
        if let Some(assignee) = edit.assigned_to {
            self.require_employee(assignee, task.project_id).await?;
        }

        let set = edit.to_set(&task, DateTime::now())?;
        if set.is_empty() {
            return Ok(task);
        }

        let written = if set.contains_key("status") {
            // Lifting the overdue marker only applies while the task is
            // still overdue; otherwise the rest of the edit goes through.
            let mut lifted = self
                .stores
                .tasks
                .update_where_status(task_id, TaskStatus::Overdue.as_str().into(), set.clone())
                .await?;
            if !lifted {
                let mut set = set;
                set.remove("status");
                lifted = self.stores.tasks.update_unless_completed(task_id, set).await?;
            }
            lifted
        } else if edit.touches_schedule() {
            self.stores.tasks.update_unless_completed(task_id, set).await?
        } else {
            self.stores
                .tasks
                .base
                .update_by_id(task_id, doc! { "$set": set })
                .await?
        };
        if !written {
            return Err(ServiceError::InvalidState(
                "Cannot change the due date or assignee of a completed task".to_string(),
            ));
        }

        self.reload(task_id).await
    }

    pub async fn delete(&self, actor: &Actor, task_id: ObjectId) -> ServiceResult<()> {
        self.task_for(actor, task_id, RoleSet::LEADS, Intent::Mutate)
            .await?;
        self.stores.tasks.delete(task_id).await?;
        info!(%task_id, "Task deleted");
        Ok(())
    }

    pub async fn get(&self, actor: &Actor, task_id: ObjectId) -> ServiceResult<Task> {
        let (task, _) = self
            .task_for(actor, task_id, RoleSet::ANY, Intent::Read)
            .await?;
        Ok(task)
    }

    pub async fn manager_tasks(
        &self,
        actor: &Actor,
        project_id: ObjectId,
    ) -> ServiceResult<Vec<Task>> {
        self.authz
            .require_project(actor, project_id, RoleSet::LEADS, Intent::Read)
            .await?;
        Ok(self.stores.tasks.for_project(project_id).await?)
    }

    pub async fn my_tasks(&self, actor: &Actor, project_id: ObjectId) -> ServiceResult<Vec<Task>> {
        self.authz
            .require_project(actor, project_id, RoleSet::EMPLOYEE, Intent::Read)
            .await?;
        Ok(self
            .stores
            .tasks
            .for_assignee(project_id, actor.user_id)
            .await?)
    }

    /// Assignee moves the task to in-progress or completed.
    pub async fn respond(
        &self,
        actor: &Actor,
        task_id: ObjectId,
        status: TaskStatus,
        submission_url: Option<String>,
    ) -> ServiceResult<Task> {
        let (task, _) = self
            .task_for(actor, task_id, RoleSet::EMPLOYEE, Intent::Mutate)
            .await?;
        if task.assigned_to != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the assignee can respond to this task".to_string(),
            ));
        }
        check_response(&task, status)?;

        let mut set = doc! { "status": status.as_str() };
        if status == TaskStatus::Completed {
            set.insert("completed_at", DateTime::now());
        }
        if let Some(url) = submission_url {
            set.insert("submission_url", url);
        }

        if !self.stores.tasks.update_unless_completed(task_id, set).await? {
            return Err(ServiceError::InvalidState("Task is already completed".to_string()));
        }

        info!(%task_id, status = status.as_str(), "Task status updated by assignee");
        self.reload(task_id).await
    }

    /// Marks every task past its due date as overdue.
    pub async fn sweep(&self, now: DateTime) -> ServiceResult<u64> {
        Ok(self.stores.tasks.mark_overdue(now).await?)
    }
}
