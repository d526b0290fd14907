#![allow(dead_code)]

use adboard::application_impl::*;
use adboard::application_port::*;
use adboard::domain_model::*;
use adboard::domain_port::*;
use adboard::infra_memory::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const IO_TIMEOUT: Duration = Duration::from_secs(2);

/// Memory store that counts reads and can be slowed down to widen race windows.
#[derive(Default)]
pub struct CountingPrincipalRepo {
    pub inner: MemoryPrincipalRepo,
    pub reads: AtomicUsize,
    pub lists: AtomicUsize,
    pub read_delay: Option<Duration>,
    /// Held after the auth row is read, so concurrent refreshes all see the same token.
    pub auth_delay: Option<Duration>,
    pub lost_rotations: AtomicUsize,
}

impl CountingPrincipalRepo {
    pub fn slow(read_delay: Duration) -> Self {
        CountingPrincipalRepo {
            read_delay: Some(read_delay),
            ..Self::default()
        }
    }

    pub fn racing_refreshes(auth_delay: Duration) -> Self {
        CountingPrincipalRepo {
            auth_delay: Some(auth_delay),
            ..Self::default()
        }
    }

    pub fn lost_rotations(&self) -> usize {
        self.lost_rotations.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for CountingPrincipalRepo {
    async fn create(&self, principal: &NewPrincipal) -> Result<PrincipalId, StoreError> {
        self.inner.create(principal).await
    }

    async fn update(&self, id: &PrincipalId, update: &PrincipalUpdate) -> Result<(), StoreError> {
        self.inner.update(id, update).await
    }

    async fn update_refresh_token(
        &self,
        id: &PrincipalId,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        self.inner.update_refresh_token(id, refresh_token).await
    }

    async fn rotate_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        refresh_token: &str,
    ) -> Result<bool, StoreError> {
        let rotated = self
            .inner
            .rotate_refresh_token(id, expected, refresh_token)
            .await?;
        if !rotated {
            self.lost_rotations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(rotated)
    }

    async fn delete(&self, id: &PrincipalId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn get_by_id(&self, id: &PrincipalId) -> Result<Principal, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_by_id(id).await
    }

    async fn get_auth_by_id(&self, id: &PrincipalId) -> Result<PrincipalAuth, StoreError> {
        let auth = self.inner.get_auth_by_id(id).await?;
        if let Some(delay) = self.auth_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(auth)
    }

    async fn list_all(&self) -> Result<Vec<PrincipalProfile>, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_all().await
    }
}

/// Cache transport that is always empty and refuses every write.
pub struct RefusingCacheLog;

#[async_trait::async_trait]
impl CacheLog for RefusingCacheLog {
    async fn append(&self, _: &CacheKey, _: &str, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Transport("cache is read-only".to_string()))
    }

    async fn read_latest(&self, _: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn remove(&self, _: &CacheKey) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Memory cache transport whose writes can be switched off mid-test.
#[derive(Default)]
pub struct FlakyCacheLog {
    pub inner: MemoryCacheLog,
    pub refuse_appends: AtomicBool,
}

impl FlakyCacheLog {
    pub fn refuse_appends(&self) {
        self.refuse_appends.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CacheLog for FlakyCacheLog {
    async fn append(&self, key: &CacheKey, payload: &str, ttl: Duration) -> Result<(), CacheError> {
        if self.refuse_appends.load(Ordering::SeqCst) {
            return Err(CacheError::Transport("write refused".to_string()));
        }
        self.inner.append(key, payload, ttl).await
    }

    async fn read_latest(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        self.inner.read_latest(key).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        self.inner.clear_all().await
    }
}

/// Cache transport whose reads always fail.
pub struct BrokenCacheLog;

#[async_trait::async_trait]
impl CacheLog for BrokenCacheLog {
    async fn append(&self, _: &CacheKey, _: &str, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Transport("connection refused".to_string()))
    }

    async fn read_latest(&self, _: &CacheKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::Transport("connection refused".to_string()))
    }

    async fn remove(&self, _: &CacheKey) -> Result<(), CacheError> {
        Err(CacheError::Transport("connection refused".to_string()))
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        Err(CacheError::Transport("connection refused".to_string()))
    }
}

pub fn jwt_config(refresh_ttl: Duration) -> JwtConfig {
    JwtConfig {
        issuer: "adboard.auth".to_string(),
        audience: "adboard-client".to_string(),
        access_ttl: Duration::from_secs(5 * 60),
        refresh_ttl,
        signing_key: b"integration-test-key".to_vec(),
    }
}

pub fn credentials(refresh_ttl: Duration) -> CredentialManager {
    let hasher = Argon2PasswordHasher::new(&HasherConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    CredentialManager::new(
        Arc::new(hasher),
        Arc::new(JwtHs256Codec::new(jwt_config(refresh_ttl))),
    )
}

pub struct Harness {
    pub service: Arc<SessionService>,
    pub principals: Arc<CountingPrincipalRepo>,
    pub adverts: Arc<MemoryAdvertRepo>,
    pub cache: Arc<RecordCache>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(
            CountingPrincipalRepo::default(),
            Arc::new(MemoryCacheLog::new()),
            Duration::from_secs(3 * 60 * 60),
        )
    }

    pub fn with_parts(
        principals: CountingPrincipalRepo,
        log: Arc<dyn CacheLog>,
        refresh_ttl: Duration,
    ) -> Self {
        let principals = Arc::new(principals);
        let adverts = Arc::new(MemoryAdvertRepo::new());
        let cache = Arc::new(RecordCache::new(
            log,
            CacheConfig {
                ttl: Duration::from_secs(60),
                io_timeout: IO_TIMEOUT,
            },
        ));
        let service = Arc::new(SessionService::new(
            principals.clone(),
            adverts.clone(),
            cache.clone(),
            credentials(refresh_ttl),
            IO_TIMEOUT,
        ));
        Harness {
            service,
            principals,
            adverts,
            cache,
        }
    }

    pub async fn register(&self, name: &str, password: &str, age: i32) -> PrincipalId {
        self.service
            .register(
                &CallContext::new(),
                RegisterInput {
                    name: name.to_string(),
                    password: password.to_string(),
                    age,
                },
            )
            .await
            .unwrap()
    }

    pub async fn login(&self, id: &PrincipalId, password: &str) -> Result<LoginResult, ServiceError> {
        self.service
            .login(
                &CallContext::new(),
                LoginInput {
                    id: id.clone(),
                    password: password.to_string(),
                },
            )
            .await
    }
}
