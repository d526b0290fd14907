mod advert;
mod cache_key;
mod principal;

pub use advert::*;
pub use cache_key::*;
pub use principal::*;
