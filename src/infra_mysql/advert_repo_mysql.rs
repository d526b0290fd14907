use super::util::fault;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlAdvertRepo {
    pool: MySqlPool,
}

impl MySqlAdvertRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlAdvertRepo { pool }
    }
}

fn advert_from_row(row: &MySqlRow) -> Result<Advert, sqlx::Error> {
    Ok(Advert {
        id: AdvertId(row.try_get("id")?),
        address: row.try_get("address")?,
        price: row.try_get("price")?,
    })
}

#[async_trait::async_trait]
impl AdvertRepo for MySqlAdvertRepo {
    async fn create(&self, advert: &NewAdvert) -> Result<AdvertId, StoreError> {
        check_price(advert.price).map_err(StoreError::Validation)?;

        let id = AdvertId(uuid::Uuid::new_v4().to_string());
        sqlx::query("INSERT INTO advert (id, address, price) VALUES (?, ?, ?)")
            .bind(id.as_str())
            .bind(&advert.address)
            .bind(advert.price)
            .execute(&self.pool)
            .await
            .map_err(|e| fault("insert advert", e))?;

        Ok(id)
    }

    async fn update(&self, id: &AdvertId, update: &AdvertUpdate) -> Result<(), StoreError> {
        check_price(update.price).map_err(StoreError::Validation)?;

        let res = sqlx::query("UPDATE advert SET address = ?, price = ? WHERE id = ?")
            .bind(&update.address)
            .bind(update.price)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| fault("update advert", e))?;

        if res.rows_affected() == 0 {
            let found = sqlx::query("SELECT 1 FROM advert WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| fault("probe advert", e))?;
            if found.is_none() {
                return Err(StoreError::NotFound);
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &AdvertId) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM advert WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| fault("delete advert", e))?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &AdvertId) -> Result<Advert, StoreError> {
        let row = sqlx::query("SELECT id, address, price FROM advert WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| fault("select advert", e))?
            .ok_or(StoreError::NotFound)?;

        advert_from_row(&row).map_err(|e| fault("decode advert", e))
    }

    async fn list_all(&self) -> Result<Vec<Advert>, StoreError> {
        let rows = sqlx::query("SELECT id, address, price FROM advert ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| fault("list adverts", e))?;

        rows.iter()
            .map(advert_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| fault("decode advert", e))
    }
}
