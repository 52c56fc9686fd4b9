use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use thiserror::Error;
use worknest_config::{JwtSettings, LinkSettings};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Password hash error: {0}")]
    HashError(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// What a signed link admits its bearer to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    CompanyInvite,
    ProjectJoin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkClaims {
    /// Intended recipient. Company invite links are open to anyone holding them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Company id for `CompanyInvite`, project id for `ProjectJoin`.
    pub target: String,
    pub kind: LinkKind,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl LinkClaims {
    pub fn target_id(&self) -> Result<ObjectId, AuthError> {
        ObjectId::parse_str(&self.target)
            .map_err(|_| AuthError::InvalidToken("Malformed link target".to_string()))
    }

    pub fn subject_id(&self) -> Result<Option<ObjectId>, AuthError> {
        self.sub
            .as_deref()
            .map(ObjectId::parse_str)
            .transpose()
            .map_err(|_| AuthError::InvalidToken("Malformed link subject".to_string()))
    }
}

pub struct AuthService {
    jwt_settings: JwtSettings,
    link_settings: LinkSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    link_encoding_key: EncodingKey,
    link_decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(jwt_settings: JwtSettings, link_settings: LinkSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(jwt_settings.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(jwt_settings.secret.as_bytes());
        let link_encoding_key = EncodingKey::from_secret(link_settings.secret.as_bytes());
        let link_decoding_key = DecodingKey::from_secret(link_settings.secret.as_bytes());
        Self {
            jwt_settings,
            link_settings,
            encoding_key,
            decoding_key,
            link_encoding_key,
            link_decoding_key,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    pub fn generate_tokens(
        &self,
        user_id: ObjectId,
        email: &str,
        username: &str,
    ) -> Result<TokenPair, AuthError> {
        let access_token = self.session_token(
            user_id,
            email,
            username,
            TokenType::Access,
            self.jwt_settings.access_token_ttl_secs,
        )?;
        let refresh_token = self.session_token(
            user_id,
            email,
            username,
            TokenType::Refresh,
            self.jwt_settings.refresh_token_ttl_secs,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.jwt_settings.access_token_ttl_secs,
        })
    }

    fn session_token(
        &self,
        user_id: ObjectId,
        email: &str,
        username: &str,
        token_type: TokenType,
        ttl_secs: u64,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_hex(),
            email: email.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_secs as i64)).timestamp(),
            iss: self.jwt_settings.issuer.clone(),
            token_type,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode_with(token, &self.decoding_key, &self.jwt_settings.issuer)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.verify_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::InvalidToken("Not an access token".to_string()));
        }
        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.verify_token(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken("Not a refresh token".to_string()));
        }
        Ok(claims)
    }

    /// Signs a link of `kind` pointing at `target`, optionally bound to one user.
    pub fn issue_link(
        &self,
        kind: LinkKind,
        target: ObjectId,
        subject: Option<ObjectId>,
    ) -> Result<String, AuthError> {
        let ttl = match kind {
            LinkKind::CompanyInvite => self.link_settings.company_invite_ttl_secs,
            LinkKind::ProjectJoin => self.link_settings.project_join_ttl_secs,
        };
        let now = Utc::now();
        let claims = LinkClaims {
            sub: subject.map(|id| id.to_hex()),
            target: target.to_hex(),
            kind,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl as i64)).timestamp(),
            iss: self.jwt_settings.issuer.clone(),
        };
        encode(&Header::default(), &claims, &self.link_encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    pub fn verify_link(&self, token: &str, expected: LinkKind) -> Result<LinkClaims, AuthError> {
        let claims: LinkClaims =
            decode_with(token, &self.link_decoding_key, &self.jwt_settings.issuer)?;
        if claims.kind != expected {
            return Err(AuthError::InvalidToken("Wrong link kind".to_string()));
        }
        Ok(claims)
    }
}

fn decode_with<C: DeserializeOwned>(
    token: &str,
    key: &DecodingKey,
    issuer: &str,
) -> Result<C, AuthError> {
    let mut validation = Validation::default();
    validation.set_issuer(&[issuer]);

    let token_data = decode::<C>(token, key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}
