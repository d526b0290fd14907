use crate::domain_model::*;
use crate::domain_port::StoreError;

#[async_trait::async_trait]
pub trait AdvertRepo: Send + Sync {
    async fn create(&self, advert: &NewAdvert) -> Result<AdvertId, StoreError>;

    async fn update(&self, id: &AdvertId, update: &AdvertUpdate) -> Result<(), StoreError>;

    async fn delete(&self, id: &AdvertId) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: &AdvertId) -> Result<Advert, StoreError>;

    async fn list_all(&self) -> Result<Vec<Advert>, StoreError>;
}
