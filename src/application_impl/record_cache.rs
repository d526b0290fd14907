use crate::application_port::{CallContext, ServiceError};
use crate::domain_model::*;
use crate::domain_port::{CacheError, CacheLog};
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of every entry written to the log.
    pub ttl: Duration,
    /// Deadline for a single cache round trip.
    pub io_timeout: Duration,
}

/// Where a read-through value came from.
#[derive(Debug)]
pub enum ReadOrigin {
    Cache,
    Store,
    /// Fetched from the store, but writing it back to the cache failed.
    StoreUncached(CacheError),
}

#[derive(Debug)]
pub struct CacheRead<T> {
    pub value: T,
    pub origin: ReadOrigin,
}

impl<T> CacheRead<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self.origin, ReadOrigin::Cache)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

type Gate = Arc<Mutex<()>>;

/// Cache-aside layer over a [`CacheLog`].
///
/// Values are JSON payloads; the newest live entry of a key wins. Concurrent misses on the
/// same key queue behind one gate so the store is asked once per population.
pub struct RecordCache {
    log: Arc<dyn CacheLog>,
    cfg: CacheConfig,
    flights: DashMap<CacheKey, Gate>,
}

struct Flight<'a> {
    flights: &'a DashMap<CacheKey, Gate>,
    key: CacheKey,
    gate: Gate,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        // The map holds one handle and we hold one; anything above that is a queued waiter.
        self.flights.remove_if(&self.key, |_, gate| {
            Arc::ptr_eq(gate, &self.gate) && Arc::strong_count(gate) <= 2
        });
    }
}

impl RecordCache {
    pub fn new(log: Arc<dyn CacheLog>, cfg: CacheConfig) -> Self {
        RecordCache {
            log,
            cfg,
            flights: DashMap::new(),
        }
    }

    pub fn principal_key(id: &PrincipalId) -> CacheKey {
        CacheKey::one(EntityClass::Principal, id.as_str())
    }

    pub fn advert_key(id: &AdvertId) -> CacheKey {
        CacheKey::one(EntityClass::Advert, id.as_str())
    }

    /// Number of keys with a population in progress.
    pub fn flights_in_progress(&self) -> usize {
        self.flights.len()
    }

    // region raw slot access

    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        key: &CacheKey,
    ) -> Result<Option<T>, ServiceError> {
        let raw = ctx
            .guard(self.cfg.io_timeout, self.log.read_latest(key))
            .await?;
        let Some(payload) = raw else {
            return Ok(None);
        };
        let value = serde_json::from_str(&payload).map_err(|e| {
            error!(%key, "cached payload is unreadable: {}", e);
            CacheError::from(e)
        })?;
        Ok(Some(value))
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        key: &CacheKey,
        value: &T,
    ) -> Result<(), ServiceError> {
        let payload = serde_json::to_string(value).map_err(CacheError::from)?;
        ctx.guard(
            self.cfg.io_timeout,
            self.log.append(key, &payload, self.cfg.ttl),
        )
        .await
    }

    pub async fn contains(&self, ctx: &CallContext, key: &CacheKey) -> Result<bool, ServiceError> {
        let raw = ctx
            .guard(self.cfg.io_timeout, self.log.read_latest(key))
            .await?;
        Ok(raw.is_some())
    }

    pub async fn remove(&self, ctx: &CallContext, key: &CacheKey) -> Result<(), ServiceError> {
        ctx.guard(self.cfg.io_timeout, self.log.remove(key)).await
    }

    pub async fn invalidate_all(&self, ctx: &CallContext) -> Result<(), ServiceError> {
        ctx.guard(self.cfg.io_timeout, self.log.clear_all()).await?;
        info!("cache invalidated");
        Ok(())
    }

    /// Clear the whole cache when either the record's slot or its class list is populated.
    /// Returns whether anything was cleared.
    pub async fn invalidate_if_cached(
        &self,
        ctx: &CallContext,
        class: EntityClass,
        id: &str,
    ) -> Result<bool, ServiceError> {
        let cached = self.contains(ctx, &CacheKey::one(class, id)).await?
            || self.contains(ctx, &CacheKey::all(class)).await?;
        if cached {
            self.invalidate_all(ctx).await?;
        }
        Ok(cached)
    }

    // endregion

    // region typed slots

    pub async fn get_principal(
        &self,
        ctx: &CallContext,
        id: &PrincipalId,
    ) -> Result<Option<PrincipalProfile>, ServiceError> {
        self.get(ctx, &Self::principal_key(id)).await
    }

    pub async fn put_principal(
        &self,
        ctx: &CallContext,
        profile: &PrincipalProfile,
    ) -> Result<(), ServiceError> {
        self.put(ctx, &Self::principal_key(&profile.id), profile)
            .await
    }

    pub async fn get_principals(
        &self,
        ctx: &CallContext,
    ) -> Result<Option<Vec<PrincipalProfile>>, ServiceError> {
        self.get(ctx, &CacheKey::all(EntityClass::Principal)).await
    }

    pub async fn put_principals(
        &self,
        ctx: &CallContext,
        profiles: &[PrincipalProfile],
    ) -> Result<(), ServiceError> {
        self.put(ctx, &CacheKey::all(EntityClass::Principal), profiles)
            .await
    }

    pub async fn get_advert(
        &self,
        ctx: &CallContext,
        id: &AdvertId,
    ) -> Result<Option<Advert>, ServiceError> {
        self.get(ctx, &Self::advert_key(id)).await
    }

    pub async fn put_advert(&self, ctx: &CallContext, advert: &Advert) -> Result<(), ServiceError> {
        self.put(ctx, &Self::advert_key(&advert.id), advert).await
    }

    pub async fn get_adverts(&self, ctx: &CallContext) -> Result<Option<Vec<Advert>>, ServiceError> {
        self.get(ctx, &CacheKey::all(EntityClass::Advert)).await
    }

    pub async fn put_adverts(
        &self,
        ctx: &CallContext,
        adverts: &[Advert],
    ) -> Result<(), ServiceError> {
        self.put(ctx, &CacheKey::all(EntityClass::Advert), adverts)
            .await
    }

    // endregion

    fn join_flight(&self, key: &CacheKey) -> Flight<'_> {
        let gate = self
            .flights
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        Flight {
            flights: &self.flights,
            key: key.clone(),
            gate,
        }
    }

    /// Serve `key` from the cache, or run `fetch` against the store and populate the slot.
    ///
    /// A failed cache read is an error. A failed write-back is not: the fetched value is
    /// returned with [`ReadOrigin::StoreUncached`].
    pub async fn read_through<T, F, Fut>(
        &self,
        ctx: &CallContext,
        key: CacheKey,
        fetch: F,
    ) -> Result<CacheRead<T>, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        if let Some(value) = self.get(ctx, &key).await? {
            debug!(%key, "cache hit");
            return Ok(CacheRead {
                value,
                origin: ReadOrigin::Cache,
            });
        }

        let flight = self.join_flight(&key);
        let _turn = ctx.wait(self.cfg.io_timeout, flight.gate.lock()).await?;

        // Whoever held the gate before us may have filled the slot already.
        if let Some(value) = self.get(ctx, &key).await? {
            debug!(%key, "cache hit after waiting on a concurrent miss");
            return Ok(CacheRead {
                value,
                origin: ReadOrigin::Cache,
            });
        }

        debug!(%key, "cache miss, reading store");
        let value = fetch().await?;

        let origin = match self.put(ctx, &key, &value).await {
            Ok(()) => ReadOrigin::Store,
            Err(e) => {
                warn!(%key, "store read succeeded but cache population failed: {}", e);
                match e {
                    ServiceError::Cache(cause) => ReadOrigin::StoreUncached(cause),
                    other => ReadOrigin::StoreUncached(CacheError::transport(other)),
                }
            }
        };
        Ok(CacheRead { value, origin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryCacheLog;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> RecordCache {
        RecordCache::new(
            Arc::new(MemoryCacheLog::new()),
            CacheConfig {
                ttl: Duration::from_secs(60),
                io_timeout: Duration::from_secs(1),
            },
        )
    }

    fn profile(id: &str, name: &str) -> PrincipalProfile {
        PrincipalProfile {
            id: PrincipalId::from(id),
            name: name.to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn newest_entry_wins() {
        let cache = cache();
        let ctx = CallContext::new();
        cache.put_principal(&ctx, &profile("p-1", "old")).await.unwrap();
        cache.put_principal(&ctx, &profile("p-1", "new")).await.unwrap();

        let got = cache
            .get_principal(&ctx, &PrincipalId::from("p-1"))
            .await
            .unwrap();
        assert_eq!(got.unwrap().name, "new");
    }

    #[tokio::test]
    async fn list_and_single_slots_are_independent() {
        let cache = cache();
        let ctx = CallContext::new();
        cache
            .put_principals(&ctx, &[profile("p-1", "a"), profile("p-2", "b")])
            .await
            .unwrap();

        assert!(
            cache
                .get_principal(&ctx, &PrincipalId::from("p-1"))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(cache.get_principals(&ctx).await.unwrap().unwrap().len(), 2);

        cache
            .remove(&ctx, &CacheKey::all(EntityClass::Principal))
            .await
            .unwrap();
        assert!(cache.get_principals(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_if_cached_only_clears_when_something_is_there() {
        let cache = cache();
        let ctx = CallContext::new();
        let advert = Advert {
            id: AdvertId::from("a-1"),
            address: "Lenina 1".to_string(),
            price: 10.0,
        };
        cache.put_advert(&ctx, &advert).await.unwrap();
        cache.put_principal(&ctx, &profile("p-1", "x")).await.unwrap();

        let cleared = cache
            .invalidate_if_cached(&ctx, EntityClass::Principal, "p-9")
            .await
            .unwrap();
        assert!(!cleared);
        assert!(cache.get_advert(&ctx, &advert.id).await.unwrap().is_some());

        let cleared = cache
            .invalidate_if_cached(&ctx, EntityClass::Principal, "p-1")
            .await
            .unwrap();
        assert!(cleared);
        assert!(cache.get_advert(&ctx, &advert.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_through_populates_then_hits() {
        let cache = cache();
        let ctx = CallContext::new();
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let key = CacheKey::one(EntityClass::Principal, "p-1");

        for expect_hit in [false, true, true] {
            let read = cache
                .read_through(&ctx, key.clone(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(profile("p-1", "Mani"))
                })
                .await
                .unwrap();
            assert_eq!(read.is_hit(), expect_hit);
            assert_eq!(read.value.name, "Mani");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.flights_in_progress(), 0);
    }

    #[tokio::test]
    async fn fetch_errors_are_returned_and_nothing_is_cached() {
        let cache = cache();
        let ctx = CallContext::new();
        let key = CacheKey::one(EntityClass::Advert, "missing");

        let res = cache
            .read_through(&ctx, key.clone(), || async {
                Err::<Advert, _>(ServiceError::NotFound)
            })
            .await;
        assert!(matches!(res, Err(ServiceError::NotFound)));
        assert!(!cache.contains(&ctx, &key).await.unwrap());
        assert_eq!(cache.flights_in_progress(), 0);
    }

    #[tokio::test]
    async fn corrupt_payload_surfaces_as_cache_error() {
        let log = Arc::new(MemoryCacheLog::new());
        let cache = RecordCache::new(
            log.clone(),
            CacheConfig {
                ttl: Duration::from_secs(60),
                io_timeout: Duration::from_secs(1),
            },
        );
        let key = CacheKey::one(EntityClass::Principal, "p-1");
        log.append(&key, "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        let res = cache.get::<PrincipalProfile>(&CallContext::new(), &key).await;
        assert!(matches!(
            res,
            Err(ServiceError::Cache(CacheError::Serialization(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_reader_gives_up_at_the_deadline() {
        let cache = cache();
        let key = CacheKey::one(EntityClass::Principal, "p-1");
        let (leader, follower) = (CallContext::new(), CallContext::new());

        let slow_fill = cache.read_through(&leader, key.clone(), || async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(profile("p-1", "Mani"))
        });
        let queued = cache.read_through(&follower, key.clone(), || async {
            Ok(profile("p-1", "second fetch"))
        });
        let (filled, waited) = tokio::join!(slow_fill, queued);

        assert!(matches!(waited, Err(ServiceError::TimedOut)));
        assert_eq!(filled.unwrap().value.name, "Mani");
        assert_eq!(cache.flights_in_progress(), 0);
    }
}
