use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::DateTime;
use serde::{Deserialize, Serialize};
use worknest_db::models::{Task, TaskStatus};
use worknest_services::task::{NewTask, TaskEdit};

use super::{hex, object_id, rfc3339};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    pub project_id: String,
    pub task_name: String,
    pub description: Option<String>,
    pub assigned_to: String,
    pub due_date: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EditTaskRequest {
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondTaskRequest {
    pub status: String,
    pub submission_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub project_id: String,
    pub task_name: String,
    pub description: Option<String>,
    pub assigned_to: String,
    pub assigned_by: String,
    pub status: &'static str,
    pub due_date: Option<String>,
    pub completed_at: Option<String>,
    pub file_url: Option<String>,
    pub submission_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: hex(task.id),
            project_id: task.project_id.to_hex(),
            task_name: task.task_name,
            description: task.description,
            assigned_to: task.assigned_to.to_hex(),
            assigned_by: task.assigned_by.to_hex(),
            status: task.status.as_str(),
            due_date: task.due_date.map(rfc3339),
            completed_at: task.completed_at.map(rfc3339),
            file_url: task.file_url,
            submission_url: task.submission_url,
            created_at: rfc3339(task.created_at),
            updated_at: rfc3339(task.updated_at),
        }
    }
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_due_date(raw: &str) -> Result<DateTime, ApiError> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(DateTime::from_chrono(parsed.with_timezone(&chrono::Utc)));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| DateTime::from_chrono(dt.and_utc()))
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid due_date: {raw}")))
}

fn tasks_json(tasks: Vec<Task>) -> Json<Vec<TaskResponse>> {
    Json(tasks.into_iter().map(Into::into).collect())
}

pub async fn assign(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AssignTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let new = NewTask {
        task_name: body.task_name,
        description: body.description,
        assigned_to: object_id(&body.assigned_to, "assigned_to")?,
        due_date: body.due_date.as_deref().map(parse_due_date).transpose()?,
        file_url: body.file_url,
    };

    let task = state.tasks.assign(&auth.actor, project_id, new).await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

pub async fn edit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    Json(body): Json<EditTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task_id = object_id(&task_id, "task_id")?;
    let edit = TaskEdit {
        task_name: body.task_name,
        description: body.description,
        due_date: body.due_date.as_deref().map(parse_due_date).transpose()?,
        assigned_to: body
            .assigned_to
            .as_deref()
            .map(|raw| object_id(raw, "assigned_to"))
            .transpose()?,
        file_url: body.file_url,
    };

    let task = state.tasks.edit(&auth.actor, task_id, edit).await?;
    Ok(Json(task.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let task_id = object_id(&task_id, "task_id")?;
    state.tasks.delete(&auth.actor, task_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task_id = object_id(&task_id, "task_id")?;
    Ok(Json(state.tasks.get(&auth.actor, task_id).await?.into()))
}

pub async fn manager_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let project_id = object_id(&project_id, "project_id")?;
    Ok(tasks_json(
        state.tasks.manager_tasks(&auth.actor, project_id).await?,
    ))
}

pub async fn my_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let project_id = object_id(&project_id, "project_id")?;
    Ok(tasks_json(state.tasks.my_tasks(&auth.actor, project_id).await?))
}

pub async fn respond(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    Json(body): Json<RespondTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task_id = object_id(&task_id, "task_id")?;
    let status: TaskStatus = body.status.parse().map_err(ApiError::BadRequest)?;
    let task = state
        .tasks
        .respond(&auth.actor, task_id, status, body.submission_url)
        .await?;
    Ok(Json(task.into()))
}
