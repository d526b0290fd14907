mod error;
mod handler;
mod router;

pub use error::{ApiErrorCode, UNAUTHORIZED_MESSAGE, recover_error};
pub use router::routes;
