use std::fmt;

/// Entity families that own cache slots.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EntityClass {
    Principal,
    Advert,
}

impl EntityClass {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityClass::Principal => "principal",
            EntityClass::Advert => "advert",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum CacheScope {
    /// A single record, by id.
    One(String),
    /// The full collection of a class.
    All,
}

/// Identifies one cache slot: a class plus either a record id or the class list.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct CacheKey {
    pub class: EntityClass,
    pub scope: CacheScope,
}

impl CacheKey {
    pub fn one(class: EntityClass, id: impl Into<String>) -> Self {
        CacheKey {
            class,
            scope: CacheScope::One(id.into()),
        }
    }

    pub fn all(class: EntityClass) -> Self {
        CacheKey {
            class,
            scope: CacheScope::All,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            CacheScope::One(id) => write!(f, "{}:one:{}", self.class.as_str(), id),
            CacheScope::All => write!(f, "{}:all", self.class.as_str()),
        }
    }
}
