use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryAdvertRepo {
    rows: DashMap<AdvertId, (u64, Advert)>,
    next_seq: AtomicU64,
}

impl MemoryAdvertRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AdvertRepo for MemoryAdvertRepo {
    async fn create(&self, advert: &NewAdvert) -> Result<AdvertId, StoreError> {
        check_price(advert.price).map_err(StoreError::Validation)?;

        let id = AdvertId(uuid::Uuid::new_v4().to_string());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rows.insert(
            id.clone(),
            (
                seq,
                Advert {
                    id: id.clone(),
                    address: advert.address.clone(),
                    price: advert.price,
                },
            ),
        );
        Ok(id)
    }

    async fn update(&self, id: &AdvertId, update: &AdvertUpdate) -> Result<(), StoreError> {
        check_price(update.price).map_err(StoreError::Validation)?;

        let mut row = self.rows.get_mut(id).ok_or(StoreError::NotFound)?;
        row.1.address = update.address.clone();
        row.1.price = update.price;
        Ok(())
    }

    async fn delete(&self, id: &AdvertId) -> Result<(), StoreError> {
        self.rows
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: &AdvertId) -> Result<Advert, StoreError> {
        self.rows
            .get(id)
            .map(|row| row.1.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<Advert>, StoreError> {
        let mut rows: Vec<(u64, Advert)> = self.rows.iter().map(|row| row.value().clone()).collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, advert)| advert).collect())
    }
}
