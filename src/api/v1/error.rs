use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Every authentication failure renders with this message, whatever the internal cause.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid credentials or token";

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if let Some(failure) = err.find::<ApiFailure>() {
        (failure.code, failure.message.clone())
    } else if err.is_not_found() {
        (ApiErrorCode::NotFound, "No such route".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (ApiErrorCode::InvalidInput, e.to_string())
    } else if err.find::<reject::MissingHeader>().is_some()
        || err.find::<reject::InvalidHeader>().is_some()
    {
        (ApiErrorCode::Unauthorized, UNAUTHORIZED_MESSAGE.to_string())
    } else if err.find::<reject::PayloadTooLarge>().is_some()
        || err.find::<reject::UnsupportedMediaType>().is_some()
        || err.find::<reject::LengthRequired>().is_some()
    {
        (ApiErrorCode::InvalidInput, "Unacceptable request body".to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (ApiErrorCode::MethodNotAllowed, "Method not allowed".to_string())
    } else {
        warn!("unhandled rejection: {:?}", err);
        (ApiErrorCode::InternalError, "Internal error".to_string())
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiErrorCode {
    InvalidInput,
    NotFound,
    MethodNotAllowed,
    Unauthorized,
    Forbidden,
    Unavailable,
    InternalError,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiFailure {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiFailure {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(ApiErrorCode::Unauthorized, UNAUTHORIZED_MESSAGE)
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!("Internal error: {}", error);
        Self::new(ApiErrorCode::InternalError, "Internal error")
    }
}

impl reject::Reject for ApiFailure {}

impl From<ServiceError> for ApiFailure {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(msg) => ApiFailure::new(ApiErrorCode::InvalidInput, msg),
            ServiceError::NotFound => ApiFailure::new(ApiErrorCode::NotFound, "Record not found"),
            ServiceError::Auth(AuthError::Internal(e)) => ApiFailure::internal(e),
            ServiceError::Auth(e) => {
                debug!("authentication failed: {:?}", e);
                ApiFailure::unauthorized()
            }
            e @ (ServiceError::Cancelled | ServiceError::TimedOut) => {
                warn!("request not completed: {}", e);
                ApiFailure::new(
                    ApiErrorCode::Unavailable,
                    "Service temporarily unavailable, retry later",
                )
            }
            ServiceError::Store(e) => ApiFailure::internal(e),
            ServiceError::Cache(e) => ApiFailure::internal(e),
        }
    }
}
