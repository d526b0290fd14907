// store

mod advert_repo;
mod principal_repo;
mod store_error;

pub use advert_repo::*;
pub use principal_repo::*;
pub use store_error::*;

// cache

mod cache_log;

pub use cache_log::*;
