use crate::domain_model::*;
use crate::domain_port::StoreError;

#[async_trait::async_trait]
pub trait PrincipalRepo: Send + Sync {
    /// Insert a principal and return its store-generated id.
    /// Fails with `Validation` before touching storage when `age` is out of range.
    async fn create(&self, principal: &NewPrincipal) -> Result<PrincipalId, StoreError>;

    /// Overwrite name and age. `NotFound` when no row matched.
    async fn update(&self, id: &PrincipalId, update: &PrincipalUpdate) -> Result<(), StoreError>;

    /// Unconditionally set the stored refresh token (empty string clears the session).
    async fn update_refresh_token(
        &self,
        id: &PrincipalId,
        refresh_token: &str,
    ) -> Result<(), StoreError>;

    /// Replace the stored refresh token only if it still equals `expected`.
    /// Returns false when another writer got there first.
    async fn rotate_refresh_token(
        &self,
        id: &PrincipalId,
        expected: &str,
        refresh_token: &str,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, id: &PrincipalId) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: &PrincipalId) -> Result<Principal, StoreError>;

    async fn get_auth_by_id(&self, id: &PrincipalId) -> Result<PrincipalAuth, StoreError>;

    async fn list_all(&self) -> Result<Vec<PrincipalProfile>, StoreError>;
}
