use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn rejected(error: ServiceError) -> warp::Rejection {
    reject::custom(ApiFailure::from(error))
}

/// Principal-scoped writes are only allowed on the caller's own record.
fn ensure_self(subject: &TokenSubject, id: &PrincipalId) -> Result<(), warp::Rejection> {
    if &subject.principal_id != id {
        return Err(reject::custom(ApiFailure::new(
            ApiErrorCode::Forbidden,
            "Operation is only allowed on your own record",
        )));
    }
    Ok(())
}

// region session

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub password: String,
    pub age: i32,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub id: PrincipalId,
}

pub async fn sign_up(
    body: SignUpRequest,
    ctx: CallContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let register_input = RegisterInput {
        name: body.name,
        password: body.password,
        age: body.age,
    };
    let id = auth_service
        .register(&ctx, register_input)
        .await
        .map_err(rejected)?;

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok(SignUpResponse { id })),
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal_id: PrincipalId,
    pub auth_tokens: AuthTokens,
}

pub async fn login(
    id: String,
    body: LoginRequest,
    ctx: CallContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        id: PrincipalId(id),
        password: body.password,
    };
    let login_result = auth_service
        .login(&ctx, login_input)
        .await
        .map_err(rejected)?;

    let login_response = LoginResponse {
        principal_id: login_result.principal_id,
        auth_tokens: login_result.tokens,
    };
    Ok(warp::reply::json(&ApiResponse::ok(login_response)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    ctx: CallContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(&ctx, &body.refresh_token)
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

pub async fn logout(
    id: String,
    subject: TokenSubject,
    ctx: CallContext,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = PrincipalId(id);
    ensure_self(&subject, &id)?;
    auth_service.logout(&ctx, &id).await.map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(())))
}

// endregion

// region principals

pub async fn list_principals(
    ctx: CallContext,
    principal_service: Arc<dyn PrincipalService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let principals = principal_service
        .list_principals(&ctx)
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(principals)))
}

pub async fn get_principal(
    id: String,
    ctx: CallContext,
    principal_service: Arc<dyn PrincipalService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let principal = principal_service
        .get_principal(&ctx, &PrincipalId(id))
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(principal)))
}

pub async fn update_principal(
    id: String,
    body: PrincipalUpdate,
    subject: TokenSubject,
    ctx: CallContext,
    principal_service: Arc<dyn PrincipalService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = PrincipalId(id);
    ensure_self(&subject, &id)?;
    let profile = principal_service
        .update_principal(&ctx, &id, body)
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(profile)))
}

pub async fn delete_principal(
    id: String,
    subject: TokenSubject,
    ctx: CallContext,
    principal_service: Arc<dyn PrincipalService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = PrincipalId(id);
    ensure_self(&subject, &id)?;
    principal_service
        .delete_principal(&ctx, &id)
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(())))
}

// endregion

// region adverts

#[derive(Debug, Serialize)]
pub struct CreateAdvertResponse {
    pub id: AdvertId,
}

pub async fn create_advert(
    body: NewAdvert,
    _subject: TokenSubject,
    ctx: CallContext,
    advert_service: Arc<dyn AdvertService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = advert_service
        .create_advert(&ctx, body)
        .await
        .map_err(rejected)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok(CreateAdvertResponse { id })),
        StatusCode::CREATED,
    ))
}

pub async fn list_adverts(
    ctx: CallContext,
    advert_service: Arc<dyn AdvertService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let adverts = advert_service.list_adverts(&ctx).await.map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(adverts)))
}

pub async fn get_advert(
    id: String,
    ctx: CallContext,
    advert_service: Arc<dyn AdvertService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let advert = advert_service
        .get_advert(&ctx, &AdvertId(id))
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(advert)))
}

pub async fn update_advert(
    id: String,
    body: AdvertUpdate,
    _subject: TokenSubject,
    ctx: CallContext,
    advert_service: Arc<dyn AdvertService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let advert = advert_service
        .update_advert(&ctx, &AdvertId(id), body)
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(advert)))
}

pub async fn delete_advert(
    id: String,
    _subject: TokenSubject,
    ctx: CallContext,
    advert_service: Arc<dyn AdvertService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    advert_service
        .delete_advert(&ctx, &AdvertId(id))
        .await
        .map_err(rejected)?;
    Ok(warp::reply::json(&ApiResponse::ok(())))
}

// endregion
