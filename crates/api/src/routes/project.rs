use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use worknest_db::models::{Project, ProjectInvite, ProjectRole};
use worknest_services::invite::{InviteRef, InviteResponse};

use super::{auth::UserResponse, hex, object_id, rfc3339};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub manager_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub project_id: String,
    #[serde(default = "default_true")]
    pub archived: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub project_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRef {
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReassignManagerRequest {
    pub project_id: String,
    pub manager_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub project_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InviteAction {
    Accept,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct RespondInviteRequest {
    pub invite_id: Option<String>,
    pub token: Option<String>,
    pub action: InviteAction,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub company_id: String,
    pub manager_id: String,
    pub archived: bool,
    pub created_at: String,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: hex(project.id),
            name: project.name,
            description: project.description,
            company_id: project.company_id.to_hex(),
            manager_id: project.manager_id.to_hex(),
            archived: project.archived,
            created_at: rfc3339(project.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InviteResponseBody {
    pub id: String,
    pub project_id: String,
    pub inviter_id: String,
    pub invitee_id: String,
    pub status: &'static str,
    pub reason: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl InviteResponseBody {
    fn new(invite: ProjectInvite, token: Option<String>) -> Self {
        Self {
            id: hex(invite.id),
            project_id: invite.project_id.to_hex(),
            inviter_id: invite.inviter_id.to_hex(),
            invitee_id: invite.invitee_id.to_hex(),
            status: invite.status.as_str(),
            reason: invite.reason,
            created_at: rfc3339(invite.created_at),
            token,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let manager_id = object_id(&body.manager_id, "manager_id")?;
    let project = state
        .projects
        .create(&auth.actor, &body.name, body.description, manager_id)
        .await?;
    Ok(Json(project.into()))
}

pub async fn list_active(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.projects.list(&auth.actor, false).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

pub async fn list_archived(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state.projects.list(&auth.actor, true).await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

pub async fn archive(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ArchiveRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let project = state
        .projects
        .set_archived(&auth.actor, project_id, body.archived)
        .await?;
    Ok(Json(project.into()))
}

pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MemberRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let user_id = object_id(&body.user_id, "user_id")?;
    state
        .projects
        .add_employee(&auth.actor, project_id, user_id)
        .await?;
    Ok(Json(serde_json::json!({ "added": true })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MemberRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let user_id = object_id(&body.user_id, "user_id")?;
    let removed = state
        .projects
        .remove_employee(&auth.actor, project_id, user_id)
        .await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

pub async fn employees(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProjectRef>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let users = state.projects.employees(&auth.actor, project_id).await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

pub async fn reassign_manager(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ReassignManagerRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let manager_id = object_id(&body.manager_id, "manager_id")?;
    let project = state
        .projects
        .reassign_manager(&auth.actor, project_id, manager_id)
        .await?;
    Ok(Json(project.into()))
}

pub async fn my_employee_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state
        .projects
        .my_projects(&auth.actor, ProjectRole::Employee)
        .await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

pub async fn my_manager_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    let projects = state
        .projects
        .my_projects(&auth.actor, ProjectRole::Manager)
        .await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

pub async fn invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<InviteRequest>,
) -> Result<Json<InviteResponseBody>, ApiError> {
    let project_id = object_id(&body.project_id, "project_id")?;
    let user_id = object_id(&body.user_id, "user_id")?;
    let (invite, token) = state
        .invites
        .create(&auth.actor, project_id, user_id)
        .await?;
    Ok(Json(InviteResponseBody::new(invite, Some(token))))
}

pub async fn respond_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<RespondInviteRequest>,
) -> Result<Json<InviteResponseBody>, ApiError> {
    let target = match (body.invite_id, body.token) {
        (Some(id), _) => InviteRef::Id(object_id(&id, "invite_id")?),
        (None, Some(token)) => InviteRef::Token(token),
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Either invite_id or token is required".to_string(),
            ));
        }
    };
    let response = match body.action {
        InviteAction::Accept => InviteResponse::Accept,
        InviteAction::Reject => InviteResponse::Reject {
            reason: body.reason.unwrap_or_default(),
        },
    };

    let invite = state
        .invites
        .respond(&auth.actor, target, response)
        .await?;
    Ok(Json(InviteResponseBody::new(invite, None)))
}

pub async fn pending_invites(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<InviteResponseBody>>, ApiError> {
    let invites = state.invites.pending_for(&auth.actor).await?;
    Ok(Json(
        invites
            .into_iter()
            .map(|i| InviteResponseBody::new(i, None))
            .collect(),
    ))
}
