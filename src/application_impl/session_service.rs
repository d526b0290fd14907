use crate::application_impl::{CredentialManager, RecordCache, tokens_match};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{AdvertRepo, PrincipalRepo};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// The one service behind every endpoint: principal and advert records through the
/// cache, and the session lifecycle of principals.
pub struct SessionService {
    pub(crate) principals: Arc<dyn PrincipalRepo>,
    pub(crate) adverts: Arc<dyn AdvertRepo>,
    pub(crate) cache: Arc<RecordCache>,
    credentials: CredentialManager,
    /// Deadline for each store call.
    pub(crate) io_timeout: Duration,
}

impl SessionService {
    pub fn new(
        principals: Arc<dyn PrincipalRepo>,
        adverts: Arc<dyn AdvertRepo>,
        cache: Arc<RecordCache>,
        credentials: CredentialManager,
        io_timeout: Duration,
    ) -> Self {
        SessionService {
            principals,
            adverts,
            cache,
            credentials,
            io_timeout,
        }
    }

    /// Best-effort removal of a single slot whose rewrite failed after a store update.
    pub(crate) async fn drop_stale_slot(&self, ctx: &CallContext, key: &CacheKey) {
        if let Err(e) = self.cache.remove(ctx, key).await {
            error!(%key, "stale slot survives a failed rewrite: {}", e);
        }
    }

    /// Drop a class list after a create. The store write already happened, so a cache
    /// failure here is only logged.
    pub(crate) async fn forget_list(&self, ctx: &CallContext, class: EntityClass) {
        if let Err(e) = self.cache.remove(ctx, &CacheKey::all(class)).await {
            warn!(class = class.as_str(), "could not drop cached list: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl AuthService for SessionService {
    async fn register(
        &self,
        ctx: &CallContext,
        request: RegisterInput,
    ) -> Result<PrincipalId, ServiceError> {
        let RegisterInput {
            name,
            password,
            age,
        } = request;

        let password_hash = self.credentials.hash_new_password(&password).await?;
        let new_principal = NewPrincipal {
            name,
            age,
            password_hash,
        };
        let id = ctx
            .guard(self.io_timeout, self.principals.create(&new_principal))
            .await?;
        info!(principal = %id, "principal registered");

        self.forget_list(ctx, EntityClass::Principal).await;
        Ok(id)
    }

    async fn login(
        &self,
        ctx: &CallContext,
        request: LoginInput,
    ) -> Result<LoginResult, ServiceError> {
        let LoginInput { id, password } = request;

        let principal = match ctx
            .guard(self.io_timeout, self.principals.get_by_id(&id))
            .await
        {
            Ok(principal) => principal,
            Err(ServiceError::NotFound) => {
                self.credentials.burn_verification(&password).await;
                warn!(principal = %id, "login rejected: unknown principal");
                return Err(AuthError::UnknownPrincipal.into());
            }
            Err(e) => return Err(e),
        };

        if !self
            .credentials
            .check_password(&password, &principal.password_hash)
            .await?
        {
            warn!(principal = %id, "login rejected: password mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self
            .credentials
            .issue_pair(&principal.id, &principal.name)
            .await?;
        ctx.guard(
            self.io_timeout,
            self.principals
                .update_refresh_token(&principal.id, &tokens.refresh_token.0),
        )
        .await?;

        info!(principal = %principal.id, "login succeeded");
        Ok(LoginResult {
            principal_id: principal.id,
            tokens,
        })
    }

    async fn refresh(
        &self,
        ctx: &CallContext,
        refresh_token: &str,
    ) -> Result<AuthTokens, ServiceError> {
        let subject = self
            .credentials
            .verify_refresh(refresh_token)
            .await
            .inspect_err(|e| warn!("refresh rejected: {}", e))?;

        let auth = match ctx
            .guard(
                self.io_timeout,
                self.principals.get_auth_by_id(&subject.principal_id),
            )
            .await
        {
            Ok(auth) => auth,
            Err(ServiceError::NotFound) => {
                warn!(principal = %subject.principal_id, "refresh rejected: principal is gone");
                return Err(AuthError::TokenRevoked.into());
            }
            Err(e) => return Err(e),
        };

        if auth.refresh_token.is_empty() || !tokens_match(refresh_token, &auth.refresh_token) {
            warn!(principal = %auth.id, "refresh rejected: token is not the stored one");
            return Err(AuthError::TokenRevoked.into());
        }

        let tokens = self.credentials.issue_pair(&auth.id, &auth.name).await?;
        let rotated = ctx
            .guard(
                self.io_timeout,
                self.principals.rotate_refresh_token(
                    &auth.id,
                    refresh_token,
                    &tokens.refresh_token.0,
                ),
            )
            .await?;
        if !rotated {
            warn!(principal = %auth.id, "refresh rejected: token was rotated concurrently");
            return Err(AuthError::TokenRevoked.into());
        }

        info!(principal = %auth.id, "session refreshed");
        Ok(tokens)
    }

    async fn logout(&self, ctx: &CallContext, id: &PrincipalId) -> Result<(), ServiceError> {
        self.cache
            .invalidate_if_cached(ctx, EntityClass::Principal, id.as_str())
            .await?;
        ctx.guard(self.io_timeout, self.principals.update_refresh_token(id, ""))
            .await?;
        info!(principal = %id, "logged out");
        Ok(())
    }

    async fn verify_access(&self, token: &str) -> Result<TokenSubject, ServiceError> {
        self.credentials.verify_access(token).await
    }
}
