use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdvertId(pub String);

impl AdvertId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdvertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for AdvertId {
    fn from(value: String) -> Self {
        AdvertId(value)
    }
}

impl From<&str> for AdvertId {
    fn from(value: &str) -> Self {
        AdvertId(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advert {
    pub id: AdvertId,
    pub address: String,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAdvert {
    pub address: String,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvertUpdate {
    pub address: String,
    pub price: f64,
}

impl AdvertUpdate {
    pub fn into_advert(self, id: AdvertId) -> Advert {
        Advert {
            id,
            address: self.address,
            price: self.price,
        }
    }
}

pub fn check_price(price: f64) -> Result<(), String> {
    if !price.is_finite() || price < 0.0 {
        return Err(format!("price must be a non-negative number, got {}", price));
    }
    Ok(())
}
