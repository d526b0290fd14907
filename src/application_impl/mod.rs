mod advert_records;
mod credential_manager;
mod principal_records;
mod record_cache;
mod session_service;

pub use credential_manager::*;
pub use record_cache::*;
pub use session_service::*;
