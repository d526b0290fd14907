use crate::application_impl::{RecordCache, SessionService};
use crate::application_port::*;
use crate::domain_model::*;
use tracing::info;

#[async_trait::async_trait]
impl PrincipalService for SessionService {
    async fn get_principal(
        &self,
        ctx: &CallContext,
        id: &PrincipalId,
    ) -> Result<PrincipalProfile, ServiceError> {
        let read = self
            .cache
            .read_through(ctx, RecordCache::principal_key(id), move || async move {
                let principal = ctx
                    .guard(self.io_timeout, self.principals.get_by_id(id))
                    .await?;
                Ok(principal.profile())
            })
            .await?;
        Ok(read.into_value())
    }

    async fn list_principals(
        &self,
        ctx: &CallContext,
    ) -> Result<Vec<PrincipalProfile>, ServiceError> {
        let read = self
            .cache
            .read_through(
                ctx,
                CacheKey::all(EntityClass::Principal),
                move || async move {
                    ctx.guard(self.io_timeout, self.principals.list_all())
                        .await
                },
            )
            .await?;
        Ok(read.into_value())
    }

    async fn update_principal(
        &self,
        ctx: &CallContext,
        id: &PrincipalId,
        update: PrincipalUpdate,
    ) -> Result<PrincipalProfile, ServiceError> {
        ctx.guard(self.io_timeout, self.principals.update(id, &update))
            .await?;

        let profile = update.into_profile(id.clone());
        if let Err(e) = self.cache.put_principal(ctx, &profile).await {
            self.drop_stale_slot(ctx, &RecordCache::principal_key(id)).await;
            return Err(e);
        }
        self.cache
            .remove(ctx, &CacheKey::all(EntityClass::Principal))
            .await?;

        info!(principal = %id, "principal updated");
        Ok(profile)
    }

    async fn delete_principal(
        &self,
        ctx: &CallContext,
        id: &PrincipalId,
    ) -> Result<(), ServiceError> {
        self.cache
            .invalidate_if_cached(ctx, EntityClass::Principal, id.as_str())
            .await?;
        ctx.guard(self.io_timeout, self.principals.delete(id))
            .await?;

        info!(principal = %id, "principal deleted");
        Ok(())
    }
}
