mod common;

use adboard::application_impl::*;
use adboard::application_port::*;
use adboard::domain_model::*;
use adboard::domain_port::*;
use common::*;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;

    let first = h.service.get_principal(&ctx, &id).await.unwrap();
    let second = h.service.get_principal(&ctx, &id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.age, 19);
    assert_eq!(h.principals.reads(), 1);
}

#[tokio::test]
async fn cache_hit_is_returned_without_revalidation() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    h.service.get_principal(&ctx, &id).await.unwrap();

    // Change the store behind the cache's back.
    h.principals
        .inner
        .update(
            &id,
            &PrincipalUpdate {
                name: "Changed".into(),
                age: 40,
            },
        )
        .await
        .unwrap();

    let cached = h.service.get_principal(&ctx, &id).await.unwrap();
    assert_eq!(cached.name, "Mani");
}

#[tokio::test]
async fn update_rewrites_the_single_slot() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    h.service.get_principal(&ctx, &id).await.unwrap();

    let updated = h
        .service
        .update_principal(
            &ctx,
            &id,
            PrincipalUpdate {
                name: "Egor".into(),
                age: 20,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Egor");

    let read = h.service.get_principal(&ctx, &id).await.unwrap();
    assert_eq!(read, updated);
    assert_eq!(h.principals.reads(), 1);
}

#[tokio::test]
async fn update_drops_the_stale_list() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    h.register("Egor", "validPW", 25).await;

    assert_eq!(h.service.list_principals(&ctx).await.unwrap().len(), 2);
    assert_eq!(h.service.list_principals(&ctx).await.unwrap().len(), 2);
    assert_eq!(h.principals.lists(), 1);

    h.service
        .update_principal(
            &ctx,
            &id,
            PrincipalUpdate {
                name: "Renamed".into(),
                age: 19,
            },
        )
        .await
        .unwrap();

    let list = h.service.list_principals(&ctx).await.unwrap();
    assert_eq!(h.principals.lists(), 2);
    assert!(list.iter().any(|p| p.name == "Renamed"));
}

#[tokio::test]
async fn registration_drops_the_stale_list() {
    let h = Harness::new();
    let ctx = CallContext::new();
    h.register("Mani", "validPW", 19).await;
    assert_eq!(h.service.list_principals(&ctx).await.unwrap().len(), 1);

    h.register("Egor", "validPW", 25).await;
    assert_eq!(h.service.list_principals(&ctx).await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_update_leaves_the_cache_alone() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    h.service.get_principal(&ctx, &id).await.unwrap();

    let res = h
        .service
        .update_principal(
            &ctx,
            &id,
            PrincipalUpdate {
                name: "Too old".into(),
                age: 250,
            },
        )
        .await;
    assert!(matches!(res, Err(ServiceError::Validation(_))));

    let cached = h.cache.get_principal(&ctx, &id).await.unwrap().unwrap();
    assert_eq!(cached.name, "Mani");
    assert_eq!(cached.age, 19);
}

#[tokio::test]
async fn failed_rewrite_after_update_drops_the_old_payload() {
    let log = Arc::new(FlakyCacheLog::default());
    let h = Harness::with_parts(
        CountingPrincipalRepo::default(),
        log.clone(),
        Duration::from_secs(600),
    );
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    h.service.get_principal(&ctx, &id).await.unwrap();

    log.refuse_appends();
    let res = h
        .service
        .update_principal(
            &ctx,
            &id,
            PrincipalUpdate {
                name: "Egor".into(),
                age: 20,
            },
        )
        .await;
    assert!(matches!(res, Err(ServiceError::Cache(_))));

    assert!(h.cache.get_principal(&ctx, &id).await.unwrap().is_none());
    let read = h.service.get_principal(&ctx, &id).await.unwrap();
    assert_eq!(read.name, "Egor");
}

#[tokio::test]
async fn delete_never_serves_the_old_payload() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    h.service.get_principal(&ctx, &id).await.unwrap();

    h.service.delete_principal(&ctx, &id).await.unwrap();

    let res = h.service.get_principal(&ctx, &id).await;
    assert!(matches!(res, Err(ServiceError::NotFound)));
}

#[tokio::test]
async fn delete_of_a_cached_record_clears_every_class() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    let advert_id = h
        .service
        .create_advert(
            &ctx,
            NewAdvert {
                address: "Lenina 1".into(),
                price: 1000.0,
            },
        )
        .await
        .unwrap();
    h.service.get_advert(&ctx, &advert_id).await.unwrap();
    h.service.get_principal(&ctx, &id).await.unwrap();

    h.service.delete_principal(&ctx, &id).await.unwrap();

    assert!(h.cache.get_advert(&ctx, &advert_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_of_an_uncached_record_keeps_other_slots() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;
    let advert_id = h
        .service
        .create_advert(
            &ctx,
            NewAdvert {
                address: "Lenina 1".into(),
                price: 1000.0,
            },
        )
        .await
        .unwrap();
    h.service.get_advert(&ctx, &advert_id).await.unwrap();

    h.service.delete_principal(&ctx, &id).await.unwrap();

    assert!(h.cache.get_advert(&ctx, &advert_id).await.unwrap().is_some());
}

#[tokio::test]
async fn store_delete_failure_surfaces_after_clearing() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let ghost = PrincipalId::from("ghost");
    h.cache
        .put_principal(
            &ctx,
            &PrincipalProfile {
                id: ghost.clone(),
                name: "stale".into(),
                age: 1,
            },
        )
        .await
        .unwrap();

    let res = h.service.delete_principal(&ctx, &ghost).await;
    assert!(matches!(res, Err(ServiceError::NotFound)));
    assert!(h.cache.get_principal(&ctx, &ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn advert_crud_goes_through_the_cache() {
    let h = Harness::new();
    let ctx = CallContext::new();
    let id = h
        .service
        .create_advert(
            &ctx,
            NewAdvert {
                address: "Lenina 1".into(),
                price: 1000.0,
            },
        )
        .await
        .unwrap();

    assert_eq!(h.service.list_adverts(&ctx).await.unwrap().len(), 1);
    let advert = h.service.get_advert(&ctx, &id).await.unwrap();
    assert_eq!(advert.address, "Lenina 1");

    let updated = h
        .service
        .update_advert(
            &ctx,
            &id,
            AdvertUpdate {
                address: "Mira 2".into(),
                price: 1200.0,
            },
        )
        .await
        .unwrap();
    assert_eq!(h.service.get_advert(&ctx, &id).await.unwrap(), updated);
    assert_eq!(h.service.list_adverts(&ctx).await.unwrap(), vec![updated]);

    h.service.delete_advert(&ctx, &id).await.unwrap();
    assert!(matches!(
        h.service.get_advert(&ctx, &id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(h.service.list_adverts(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_misses_fetch_once() {
    let h = Harness::with_parts(
        CountingPrincipalRepo::slow(Duration::from_millis(50)),
        Arc::new(adboard::infra_memory::MemoryCacheLog::new()),
        Duration::from_secs(600),
    );
    let id = h.register("Mani", "validPW", 19).await;

    let reads = (0..16).map(|_| {
        let service = h.service.clone();
        let id = id.clone();
        async move { service.get_principal(&CallContext::new(), &id).await }
    });
    let results = join_all(reads).await;

    assert!(results.iter().all(|r| matches!(r, Ok(p) if p.age == 19)));
    assert_eq!(h.principals.reads(), 1);
    assert_eq!(h.cache.flights_in_progress(), 0);
}

#[tokio::test]
async fn cancelled_reader_stops_waiting_on_a_concurrent_miss() {
    let h = Harness::with_parts(
        CountingPrincipalRepo::slow(Duration::from_millis(1500)),
        Arc::new(adboard::infra_memory::MemoryCacheLog::new()),
        Duration::from_secs(600),
    );
    let id = h.register("Mani", "validPW", 19).await;

    let leader = {
        let service = h.service.clone();
        let id = id.clone();
        tokio::spawn(async move { service.get_principal(&CallContext::new(), &id).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let ctx = CallContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let res = h.service.get_principal(&ctx, &id).await;
    assert!(matches!(res, Err(ServiceError::Cancelled)));
    assert!(started.elapsed() < Duration::from_millis(800));

    assert!(leader.await.unwrap().is_ok());
    assert_eq!(h.principals.reads(), 1);
    assert_eq!(h.cache.flights_in_progress(), 0);
}

#[tokio::test]
async fn failed_population_still_returns_the_data() {
    let h = Harness::with_parts(
        CountingPrincipalRepo::default(),
        Arc::new(RefusingCacheLog),
        Duration::from_secs(600),
    );
    let ctx = CallContext::new();
    let id = h.register("Mani", "validPW", 19).await;

    let profile = h.service.get_principal(&ctx, &id).await.unwrap();
    assert_eq!(profile.name, "Mani");

    let read = h
        .cache
        .read_through(&ctx, RecordCache::principal_key(&id), move || async move {
            Ok(profile)
        })
        .await
        .unwrap();
    assert!(matches!(
        read.origin,
        ReadOrigin::StoreUncached(CacheError::Transport(_))
    ));
}

#[tokio::test]
async fn cache_read_faults_are_not_misses() {
    let h = Harness::with_parts(
        CountingPrincipalRepo::default(),
        Arc::new(BrokenCacheLog),
        Duration::from_secs(600),
    );
    let ctx = CallContext::new();
    let id = h
        .principals
        .inner
        .create(&NewPrincipal {
            name: "Mani".into(),
            age: 19,
            password_hash: "unused".into(),
        })
        .await
        .unwrap();

    let res = h.service.get_principal(&ctx, &id).await;
    assert!(matches!(res, Err(ServiceError::Cache(_))));
    assert_eq!(h.principals.reads(), 0);
}

#[tokio::test]
async fn cancelled_calls_do_not_touch_the_store() {
    let h = Harness::new();
    let id = h.register("Mani", "validPW", 19).await;
    let ctx = CallContext::new();
    ctx.cancel();

    let res = h.service.get_principal(&ctx, &id).await;
    assert!(matches!(res, Err(ServiceError::Cancelled)));
    assert!(res.unwrap_err().is_retryable());
    assert_eq!(h.principals.reads(), 0);
}
