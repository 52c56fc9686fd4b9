use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use worknest_db::models::Company;
use worknest_services::company::RemovalReport;

use super::{hex, object_id, rfc3339};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinCompanyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CompanyResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: String,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        Self {
            id: hex(company.id),
            name: company.name,
            description: company.description,
            owner_id: company.owner_id.to_hex(),
            created_at: rfc3339(company.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InviteLinkResponse {
    pub company_id: String,
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub company: CompanyResponse,
    pub already_member: bool,
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateCompanyRequest>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company = state
        .companies
        .create(&auth.actor, &body.name, body.description)
        .await?;
    Ok(Json(company.into()))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<CompanyResponse>, ApiError> {
    Ok(Json(state.companies.get(&auth.actor).await?.into()))
}

pub async fn invite_link(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<InviteLinkResponse>, ApiError> {
    let (company, token) = state.companies.invite_link(&auth.actor).await?;
    Ok(Json(InviteLinkResponse {
        company_id: hex(company.id),
        token,
        expires_in: state.settings.links.company_invite_ttl_secs,
    }))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JoinCompanyRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let outcome = state.companies.join(&auth.actor, &body.token).await?;
    Ok(Json(JoinResponse {
        company: outcome.company.into(),
        already_member: outcome.already_member,
    }))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<RemoveMemberRequest>,
) -> Result<Json<RemovalReport>, ApiError> {
    let user_id = object_id(&body.user_id, "user_id")?;
    Ok(Json(state.companies.remove_member(&auth.actor, user_id).await?))
}
