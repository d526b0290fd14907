mod auth_service;
mod context;
mod error;
mod record_service;

pub use auth_service::*;
pub use context::*;
pub use error::*;
pub use record_service::*;
