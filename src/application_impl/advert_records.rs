use crate::application_impl::{RecordCache, SessionService};
use crate::application_port::*;
use crate::domain_model::*;
use tracing::info;

#[async_trait::async_trait]
impl AdvertService for SessionService {
    async fn create_advert(
        &self,
        ctx: &CallContext,
        advert: NewAdvert,
    ) -> Result<AdvertId, ServiceError> {
        let id = ctx
            .guard(self.io_timeout, self.adverts.create(&advert))
            .await?;
        info!(advert = %id, "advert created");

        self.forget_list(ctx, EntityClass::Advert).await;
        Ok(id)
    }

    async fn get_advert(&self, ctx: &CallContext, id: &AdvertId) -> Result<Advert, ServiceError> {
        let read = self
            .cache
            .read_through(ctx, RecordCache::advert_key(id), move || async move {
                ctx.guard(self.io_timeout, self.adverts.get_by_id(id)).await
            })
            .await?;
        Ok(read.into_value())
    }

    async fn list_adverts(&self, ctx: &CallContext) -> Result<Vec<Advert>, ServiceError> {
        let read = self
            .cache
            .read_through(ctx, CacheKey::all(EntityClass::Advert), move || async move {
                ctx.guard(self.io_timeout, self.adverts.list_all()).await
            })
            .await?;
        Ok(read.into_value())
    }

    async fn update_advert(
        &self,
        ctx: &CallContext,
        id: &AdvertId,
        update: AdvertUpdate,
    ) -> Result<Advert, ServiceError> {
        ctx.guard(self.io_timeout, self.adverts.update(id, &update))
            .await?;

        let advert = update.into_advert(id.clone());
        if let Err(e) = self.cache.put_advert(ctx, &advert).await {
            self.drop_stale_slot(ctx, &RecordCache::advert_key(id)).await;
            return Err(e);
        }
        self.cache
            .remove(ctx, &CacheKey::all(EntityClass::Advert))
            .await?;

        info!(advert = %id, "advert updated");
        Ok(advert)
    }

    async fn delete_advert(&self, ctx: &CallContext, id: &AdvertId) -> Result<(), ServiceError> {
        self.cache
            .invalidate_if_cached(ctx, EntityClass::Advert, id.as_str())
            .await?;
        ctx.guard(self.io_timeout, self.adverts.delete(id)).await?;

        info!(advert = %id, "advert deleted");
        Ok(())
    }
}
