use crate::application_port::{
    AccessToken, AuthError, AuthTokens, CredentialHasher, RefreshToken, ServiceError,
    TokenCodec, TokenSubject,
};
use crate::domain_model::PrincipalId;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

// region password hashing

/// Argon2id cost parameters. The defaults land around 100ms per verification on
/// commodity hardware.
#[derive(Debug, Clone)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        HasherConfig {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    pub fn new(cfg: &HasherConfig) -> Result<Self, AuthError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| AuthError::Internal(format!("argon2 params: {}", e)))?;
        Ok(Argon2PasswordHasher { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let argon2 = self.argon2();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::Internal(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task: {}", e)))?
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let argon2 = self.argon2();
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&password_hash)
                .map_err(|e| AuthError::Internal(format!("invalid PHC hash: {}", e)))?;

            // Parameters come from the PHC string, so hashes made under older costs still verify.
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(_) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(AuthError::Internal(format!("verify error: {}", e))),
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verification task: {}", e)))?
    }
}

// endregion

// region tokens

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: String, // principal id
    #[serde(default)]
    name: String, // display name
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // unique per issuance, so a rotated token never repeats
    typ: TokenType,
}

/// HS256 signer/verifier. Keys are derived once from the injected secret and never change.
pub struct JwtHs256Codec {
    cfg: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(&cfg.signing_key);
        let decoding_key = DecodingKey::from_secret(&cfg.signing_key);

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_issuer(&[cfg.issuer.as_str()]);

        JwtHs256Codec {
            cfg,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            claims,
            &self.encoding_key,
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn issue(
        &self,
        typ: TokenType,
        principal: &PrincipalId,
        name: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AuthError::Internal(format!("token ttl: {}", e)))?;
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + ttl;
        let claims = Claims {
            sub: principal.to_string(),
            name: name.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            jti: Self::gen_jti(),
            typ,
        };
        let token = self.encode_claims(&claims)?;
        Ok((token, exp_dt))
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<TokenSubject, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!("token rejected: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            }
        })?;
        let claims = data.claims;

        if claims.typ != expected {
            return Err(AuthError::TokenInvalid);
        }
        if claims.sub.trim().is_empty() {
            return Err(AuthError::MissingClaim);
        }

        Ok(TokenSubject {
            principal_id: PrincipalId(claims.sub),
            name: claims.name,
            jti: claims.jti,
        })
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs256Codec {
    async fn issue_access_token(
        &self,
        principal: &PrincipalId,
        name: &str,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) = self.issue(TokenType::Access, principal, name, self.cfg.access_ttl)?;
        Ok((AccessToken(token), exp_dt))
    }

    async fn issue_refresh_token(
        &self,
        principal: &PrincipalId,
        name: &str,
    ) -> Result<(RefreshToken, DateTime<Utc>), AuthError> {
        let (token, exp_dt) =
            self.issue(TokenType::Refresh, principal, name, self.cfg.refresh_ttl)?;
        Ok((RefreshToken(token), exp_dt))
    }

    async fn verify_access_token(&self, token: &AccessToken) -> Result<TokenSubject, AuthError> {
        self.verify(&token.0, TokenType::Access)
    }

    async fn verify_refresh_token(
        &self,
        token: &RefreshToken,
    ) -> Result<TokenSubject, AuthError> {
        self.verify(&token.0, TokenType::Refresh)
    }
}

// endregion

/// Byte-for-byte comparison whose running time does not depend on where the inputs differ.
#[must_use]
pub fn tokens_match(presented: &str, stored: &str) -> bool {
    constant_time_eq::constant_time_eq(presented.as_bytes(), stored.as_bytes())
}

/// Owns everything password- and token-shaped. Nothing else looks inside a token.
pub struct CredentialManager {
    hasher: Arc<dyn CredentialHasher>,
    codec: Arc<dyn TokenCodec>,
    decoy_hash: OnceCell<String>,
}

impl CredentialManager {
    pub fn new(hasher: Arc<dyn CredentialHasher>, codec: Arc<dyn TokenCodec>) -> Self {
        CredentialManager {
            hasher,
            codec,
            decoy_hash: OnceCell::new(),
        }
    }

    pub async fn hash_new_password(&self, password: &str) -> Result<String, ServiceError> {
        if password.trim().is_empty() {
            return Err(ServiceError::Validation(
                "password must not be empty or blank".to_string(),
            ));
        }
        Ok(self.hasher.hash_password(password).await?)
    }

    pub async fn check_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self.hasher.verify_password(password, password_hash).await?)
    }

    /// Spend one verification's worth of work when there is no real hash to check,
    /// so an unknown id costs the same as a wrong password.
    pub async fn burn_verification(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hasher.hash_password("decoy-password"))
            .await;
        if let Ok(hash) = decoy {
            let _ = self.hasher.verify_password(password, hash).await;
        }
    }

    /// Sign a fresh access/refresh pair. Persisting the refresh token is the caller's half
    /// of issuance and must succeed for the pair to be handed out.
    pub async fn issue_pair(
        &self,
        principal: &PrincipalId,
        name: &str,
    ) -> Result<AuthTokens, ServiceError> {
        let (access_token, access_exp) = self.codec.issue_access_token(principal, name).await?;
        let (refresh_token, refresh_exp) =
            self.codec.issue_refresh_token(principal, name).await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }

    pub async fn verify_refresh(&self, token: &str) -> Result<TokenSubject, ServiceError> {
        Ok(self
            .codec
            .verify_refresh_token(&RefreshToken(token.to_string()))
            .await?)
    }

    pub async fn verify_access(&self, token: &str) -> Result<TokenSubject, ServiceError> {
        Ok(self
            .codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await?)
    }
}
