use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};
use worknest_db::models::User;
use worknest_services::auth::TokenPair;
use worknest_services::dao::persisted;

use super::hex;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    pub full_name: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    let charset = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if (3..=16).contains(&len) && charset {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("Username must be 3-16 letters, digits or underscores".into()))
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    let has_symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());
    if password.chars().count() >= 8 && has_symbol {
        Ok(())
    } else {
        Err(ValidationError::new("password")
            .with_message("Password must be at least 8 characters and contain a symbol".into()))
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub company_id: Option<String>,
    pub profile_picture_url: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: hex(user.id),
            email: user.email,
            username: user.username,
            full_name: user.full_name,
            company_id: user.company_id.map(|id| id.to_hex()),
            profile_picture_url: user.profile_picture_url,
            phone: user.phone,
            bio: user.bio,
            skills: user.skills,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Full name must be 1-100 characters"))]
    pub full_name: Option<String>,
    #[validate(url(message = "Invalid profile picture URL"))]
    pub profile_picture_url: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(length(max = 50))]
    pub skills: Option<Vec<String>>,
}

fn session_response(
    tokens: TokenPair,
    user: User,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|e| ApiError::Internal(e.to_string()))?,
    );

    let response = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: user.into(),
    };
    Ok((headers, Json(response)))
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;
    let password_hash = state.auth.hash_password(&body.password)?;

    let user = state
        .stores
        .users
        .create(
            body.email.trim().to_lowercase(),
            body.username.clone(),
            body.full_name.trim().to_string(),
            password_hash,
        )
        .await
        .map_err(|e| match e {
            worknest_services::dao::DaoError::DuplicateKey(_) => {
                ApiError::Conflict("Email or username is already registered".to_string())
            }
            other => other.into(),
        })?;

    let user_id = persisted(user.id)?;
    info!(%user_id, username = %user.username, "User registered");

    let tokens = state
        .auth
        .generate_tokens(user_id, &user.email, &user.username)?;
    let (headers, body) = session_response(tokens, user)?;
    Ok((StatusCode::CREATED, headers, body))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let user = if let Some(ref username) = body.username {
        state.stores.users.find_by_username(username).await
    } else if let Some(ref email) = body.email {
        state
            .stores
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await
    } else {
        return Err(ApiError::BadRequest(
            "Either username or email is required".to_string(),
        ));
    }
    .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("No password set".to_string()))?;

    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id = persisted(user.id)?;
    let tokens = state
        .auth
        .generate_tokens(user_id, &user.email, &user.username)?;
    session_response(tokens, user)
}

pub async fn logout() -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("access_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0"),
    );
    Ok(headers)
}

pub async fn me(auth: AuthUser) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(auth.user.into()))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let claims = state.auth.verify_refresh_token(&body.refresh_token)?;

    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID".to_string()))?;

    let user = state
        .stores
        .users
        .base
        .find_by_id(user_id)
        .await
        .map_err(|_| ApiError::Unauthorized("User no longer exists".to_string()))?;

    let tokens = state
        .auth
        .generate_tokens(user_id, &user.email, &user.username)?;
    session_response(tokens, user)
}

pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    body.validate()?;

    let current = auth
        .user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("No password set".to_string()))?;
    if !state.auth.verify_password(&body.old_password, current)? {
        return Err(ApiError::Unauthorized("Old password is incorrect".to_string()));
    }

    let hash = state.auth.hash_password(&body.new_password)?;
    state
        .stores
        .users
        .update_password(auth.user_id, hash)
        .await?;

    info!(user_id = %auth.user_id, "Password updated");
    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    body.validate()?;

    let skills = body.skills.map(|skills| {
        skills
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });
    let changed = state
        .stores
        .users
        .update_profile(
            auth.user_id,
            body.full_name.map(|n| n.trim().to_string()),
            body.profile_picture_url,
            body.phone,
            body.bio,
            skills,
        )
        .await?;
    if !changed {
        return Ok(Json(auth.user.into()));
    }

    info!(user_id = %auth.user_id, "Profile updated");
    let user = state.stores.users.base.find_by_id(auth.user_id).await?;
    Ok(Json(user.into()))
}
