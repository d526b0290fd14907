use crate::application_port::{CallContext, ServiceError};
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait PrincipalService: Send + Sync {
    async fn get_principal(
        &self,
        ctx: &CallContext,
        id: &PrincipalId,
    ) -> Result<PrincipalProfile, ServiceError>;
    async fn list_principals(&self, ctx: &CallContext)
    -> Result<Vec<PrincipalProfile>, ServiceError>;
    async fn update_principal(
        &self,
        ctx: &CallContext,
        id: &PrincipalId,
        update: PrincipalUpdate,
    ) -> Result<PrincipalProfile, ServiceError>;
    async fn delete_principal(&self, ctx: &CallContext, id: &PrincipalId)
    -> Result<(), ServiceError>;
}

#[async_trait::async_trait]
pub trait AdvertService: Send + Sync {
    async fn create_advert(
        &self,
        ctx: &CallContext,
        advert: NewAdvert,
    ) -> Result<AdvertId, ServiceError>;
    async fn get_advert(&self, ctx: &CallContext, id: &AdvertId) -> Result<Advert, ServiceError>;
    async fn list_adverts(&self, ctx: &CallContext) -> Result<Vec<Advert>, ServiceError>;
    async fn update_advert(
        &self,
        ctx: &CallContext,
        id: &AdvertId,
        update: AdvertUpdate,
    ) -> Result<Advert, ServiceError>;
    async fn delete_advert(&self, ctx: &CallContext, id: &AdvertId) -> Result<(), ServiceError>;
}
