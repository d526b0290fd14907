use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 180;

/// Store-generated principal identifier. Opaque to everything above the store.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PrincipalId {
    fn from(value: String) -> Self {
        PrincipalId(value)
    }
}

impl From<&str> for PrincipalId {
    fn from(value: &str) -> Self {
        PrincipalId(value.to_string())
    }
}

/// Full stored record, secrets included. Never leaves the service layer.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub age: i32,
    pub password_hash: String,
    /// Empty when the principal has no active session.
    pub refresh_token: String,
}

impl Principal {
    pub fn profile(&self) -> PrincipalProfile {
        PrincipalProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            age: self.age,
        }
    }

    pub fn has_session(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// Public view of a principal. This is what reads return and what gets cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalProfile {
    pub id: PrincipalId,
    pub name: String,
    pub age: i32,
}

/// Auth-only projection of a principal. `name` is the current display name signed into
/// rotated tokens.
#[derive(Debug, Clone)]
pub struct PrincipalAuth {
    pub id: PrincipalId,
    pub name: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub name: String,
    pub age: i32,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalUpdate {
    pub name: String,
    pub age: i32,
}

impl PrincipalUpdate {
    pub fn into_profile(self, id: PrincipalId) -> PrincipalProfile {
        PrincipalProfile {
            id,
            name: self.name,
            age: self.age,
        }
    }
}

/// Range check shared by every store adapter; runs before any write.
pub fn check_age(age: i32) -> Result<(), String> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(format!(
            "age must be between {} and {}, got {}",
            MIN_AGE, MAX_AGE, age
        ));
    }
    Ok(())
}
