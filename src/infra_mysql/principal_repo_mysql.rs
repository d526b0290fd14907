use super::util::fault;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlPrincipalRepo {
    pool: MySqlPool,
}

impl MySqlPrincipalRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlPrincipalRepo { pool }
    }
}

fn profile_from_row(row: &MySqlRow) -> Result<PrincipalProfile, sqlx::Error> {
    Ok(PrincipalProfile {
        id: PrincipalId(row.try_get("id")?),
        name: row.try_get("name")?,
        age: row.try_get("age")?,
    })
}

#[async_trait::async_trait]
impl PrincipalRepo for MySqlPrincipalRepo {
    async fn create(&self, principal: &NewPrincipal) -> Result<PrincipalId, StoreError> {
        check_age(principal.age).map_err(StoreError::Validation)?;

        let id = PrincipalId(uuid::Uuid::new_v4().to_string());
        sqlx::query(
            r#"
INSERT INTO principal (id, name, age, password_hash, refresh_token)
VALUES (?, ?, ?, ?, '')
"#,
        )
        .bind(id.as_str())
        .bind(&principal.name)
        .bind(principal.age)
        .bind(&principal.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| fault("insert principal", e))?;

        Ok(id)
    }

    async fn update(&self, id: &PrincipalId, update: &PrincipalUpdate) -> Result<(), StoreError> {
        check_age(update.age).map_err(StoreError::Validation)?;

        let res = sqlx::query("UPDATE principal SET name = ?, age = ? WHERE id = ?")
            .bind(&update.name)
            .bind(update.age)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| fault("update principal", e))?;

        if res.rows_affected() == 0 && !self.exists(id).await? {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: &PrincipalId,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        let res = sqlx::query("UPDATE principal SET refresh_token = ? WHERE id = ?")
            .bind(refresh_token)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| fault("update refresh token", e))?;

        // An unchanged row reports zero affected rows; only a missing row is an error.
        if res.rows_affected() == 0 && !self.exists(id).await? {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        refresh_token: &str,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
UPDATE principal
SET refresh_token = ?
WHERE id = ? AND refresh_token = ? AND refresh_token <> ''
"#,
        )
        .bind(refresh_token)
        .bind(id.as_str())
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| fault("rotate refresh token", e))?;

        Ok(res.rows_affected() == 1)
    }

    async fn delete(&self, id: &PrincipalId) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM principal WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| fault("delete principal", e))?;

        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &PrincipalId) -> Result<Principal, StoreError> {
        let row = sqlx::query(
            r#"
SELECT id, name, age, password_hash, refresh_token
FROM principal
WHERE id = ?
"#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| fault("select principal", e))?
        .ok_or(StoreError::NotFound)?;

        let principal = Principal {
            id: PrincipalId(row.try_get("id").map_err(|e| fault("decode id", e))?),
            name: row.try_get("name").map_err(|e| fault("decode name", e))?,
            age: row.try_get("age").map_err(|e| fault("decode age", e))?,
            password_hash: row
                .try_get("password_hash")
                .map_err(|e| fault("decode password_hash", e))?,
            refresh_token: row
                .try_get("refresh_token")
                .map_err(|e| fault("decode refresh_token", e))?,
        };
        Ok(principal)
    }

    async fn get_auth_by_id(&self, id: &PrincipalId) -> Result<PrincipalAuth, StoreError> {
        let row = sqlx::query("SELECT id, name, refresh_token FROM principal WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| fault("select principal auth", e))?
            .ok_or(StoreError::NotFound)?;

        Ok(PrincipalAuth {
            id: PrincipalId(row.try_get("id").map_err(|e| fault("decode id", e))?),
            name: row.try_get("name").map_err(|e| fault("decode name", e))?,
            refresh_token: row
                .try_get("refresh_token")
                .map_err(|e| fault("decode refresh_token", e))?,
        })
    }

    async fn list_all(&self) -> Result<Vec<PrincipalProfile>, StoreError> {
        let rows = sqlx::query("SELECT id, name, age FROM principal ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| fault("list principals", e))?;

        rows.iter()
            .map(profile_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| fault("decode principal", e))
    }
}

impl MySqlPrincipalRepo {
    async fn exists(&self, id: &PrincipalId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM principal WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| fault("probe principal", e))?;
        Ok(row.is_some())
    }
}
