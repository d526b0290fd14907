use crate::application_port::{CallContext, ServiceError};
use crate::domain_model::PrincipalId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why an authentication step failed. The variants stay distinct for logging;
/// the HTTP boundary collapses all of them into one response.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    // Must render exactly like InvalidCredentials so callers cannot probe for ids.
    #[error("invalid credentials")]
    UnknownPrincipal,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("token is missing a required claim")]
    MissingClaim,
    #[error("token revoked")]
    TokenRevoked,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub password: String,
    pub age: i32,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub id: PrincipalId,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub principal_id: PrincipalId,
    pub tokens: AuthTokens,
}

/// Verified identity carried by a token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub principal_id: PrincipalId,
    pub name: String,
    pub jti: String,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        principal: &PrincipalId,
        name: &str,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    async fn issue_refresh_token(
        &self,
        principal: &PrincipalId,
        name: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError>;
    async fn verify_access_token(&self, token: &AccessToken) -> Result<TokenSubject, AuthError>;
    async fn verify_refresh_token(&self, token: &RefreshToken)
    -> Result<TokenSubject, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(
        &self,
        ctx: &CallContext,
        request: RegisterInput,
    ) -> Result<PrincipalId, ServiceError>;
    async fn login(&self, ctx: &CallContext, request: LoginInput)
    -> Result<LoginResult, ServiceError>;
    async fn refresh(
        &self,
        ctx: &CallContext,
        refresh_token: &str,
    ) -> Result<AuthTokens, ServiceError>;
    async fn logout(&self, ctx: &CallContext, id: &PrincipalId) -> Result<(), ServiceError>;
    async fn verify_access(&self, token: &str) -> Result<TokenSubject, ServiceError>;
}
