use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SIGNING_KEY_ENV: &str = "JWT_SIGNING_KEY";
#[cfg(debug_assertions)]
const DEV_SIGNING_KEY: &str = "adboard-dev-secret-key";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub principal_service: Arc<dyn PrincipalService>,
    pub advert_service: Arc<dyn AdvertService>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

fn signing_key() -> anyhow::Result<Vec<u8>> {
    match std::env::var(SIGNING_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key.into_bytes()),
        _ => {
            #[cfg(debug_assertions)]
            {
                warn!("{} is not set, using the development key", SIGNING_KEY_ENV);
                Ok(DEV_SIGNING_KEY.as_bytes().to_vec())
            }
            #[cfg(not(debug_assertions))]
            {
                Err(anyhow::anyhow!("{} must be set", SIGNING_KEY_ENV))
            }
        }
    }
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let io_timeout = Duration::from_millis(settings.io.timeout_ms);

        let cache_log: Arc<dyn CacheLog> = match settings.cache.backend.as_str() {
            "memory" => Arc::new(MemoryCacheLog::new()),
            "redis" => {
                let redis_client = redis::Client::open(settings.cache.dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                let log = RedisCacheLog::new(redis_manager, settings.cache.prefix.clone());
                log.ping().await?;
                Arc::new(log)
            }
            other => return Err(anyhow::anyhow!("Unknown cache backend: {}", other)),
        };
        let cache = Arc::new(RecordCache::new(
            cache_log,
            CacheConfig {
                ttl: Duration::from_secs(settings.cache.ttl_secs),
                io_timeout,
            },
        ));

        let (principal_repo, advert_repo, pool): (
            Arc<dyn PrincipalRepo>,
            Arc<dyn AdvertRepo>,
            Option<MySqlPool>,
        ) = match settings.store.backend.as_str() {
            "memory" => {
                let principals: Arc<dyn PrincipalRepo> = Arc::new(MemoryPrincipalRepo::new());
                let adverts: Arc<dyn AdvertRepo> = Arc::new(MemoryAdvertRepo::new());
                (principals, adverts, None)
            }
            "mysql" => {
                let pool = connect_pool(
                    &settings.store.dsn,
                    settings.store.max_connections,
                    io_timeout,
                )
                .await?;
                let principals: Arc<dyn PrincipalRepo> =
                    Arc::new(MySqlPrincipalRepo::new(pool.clone()));
                let adverts: Arc<dyn AdvertRepo> = Arc::new(MySqlAdvertRepo::new(pool.clone()));
                (principals, adverts, Some(pool))
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2PasswordHasher::new(&HasherConfig {
                memory_kib: settings.hasher.memory_kib,
                iterations: settings.hasher.iterations,
                parallelism: settings.hasher.parallelism,
            })?);
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            signing_key: signing_key()?,
        }));

        let session_service = Arc::new(SessionService::new(
            principal_repo,
            advert_repo,
            cache,
            CredentialManager::new(credential_hasher, token_codec),
            io_timeout,
        ));

        info!(
            store = %settings.store.backend,
            cache = %settings.cache.backend,
            "server started"
        );

        Ok(Self {
            auth_service: session_service.clone(),
            principal_service: session_service.clone(),
            advert_service: session_service,
            cancel: CancellationToken::new(),
            pool,
        })
    }

    /// Parent of every request's cancellation token.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
