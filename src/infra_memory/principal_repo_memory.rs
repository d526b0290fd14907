use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

struct Row {
    seq: u64,
    principal: Principal,
}

/// DashMap-backed principal table. Every write holds the row's shard lock, so the
/// compare-and-swap in `rotate_refresh_token` is atomic.
#[derive(Default)]
pub struct MemoryPrincipalRepo {
    rows: DashMap<PrincipalId, Row>,
    next_seq: AtomicU64,
}

impl MemoryPrincipalRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait::async_trait]
impl PrincipalRepo for MemoryPrincipalRepo {
    async fn create(&self, principal: &NewPrincipal) -> Result<PrincipalId, StoreError> {
        check_age(principal.age).map_err(StoreError::Validation)?;

        let id = PrincipalId(uuid::Uuid::new_v4().to_string());
        let row = Row {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            principal: Principal {
                id: id.clone(),
                name: principal.name.clone(),
                age: principal.age,
                password_hash: principal.password_hash.clone(),
                refresh_token: String::new(),
            },
        };
        self.rows.insert(id.clone(), row);
        Ok(id)
    }

    async fn update(&self, id: &PrincipalId, update: &PrincipalUpdate) -> Result<(), StoreError> {
        check_age(update.age).map_err(StoreError::Validation)?;

        let mut row = self.rows.get_mut(id).ok_or(StoreError::NotFound)?;
        row.principal.name = update.name.clone();
        row.principal.age = update.age;
        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: &PrincipalId,
        refresh_token: &str,
    ) -> Result<(), StoreError> {
        let mut row = self.rows.get_mut(id).ok_or(StoreError::NotFound)?;
        row.principal.refresh_token = refresh_token.to_string();
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        refresh_token: &str,
    ) -> Result<bool, StoreError> {
        let Some(mut row) = self.rows.get_mut(id) else {
            return Ok(false);
        };
        if row.principal.refresh_token.is_empty() || row.principal.refresh_token != expected {
            return Ok(false);
        }
        row.principal.refresh_token = refresh_token.to_string();
        Ok(true)
    }

    async fn delete(&self, id: &PrincipalId) -> Result<(), StoreError> {
        self.rows
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: &PrincipalId) -> Result<Principal, StoreError> {
        self.rows
            .get(id)
            .map(|row| row.principal.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn get_auth_by_id(&self, id: &PrincipalId) -> Result<PrincipalAuth, StoreError> {
        self.rows
            .get(id)
            .map(|row| PrincipalAuth {
                id: row.principal.id.clone(),
                name: row.principal.name.clone(),
                refresh_token: row.principal.refresh_token.clone(),
            })
            .ok_or(StoreError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<PrincipalProfile>, StoreError> {
        let mut rows: Vec<(u64, PrincipalProfile)> = self
            .rows
            .iter()
            .map(|row| (row.seq, row.principal.profile()))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, profile)| profile).collect())
    }
}
