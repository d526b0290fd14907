use super::error::*;
use super::handler;
use crate::application_port::*;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use warp::{Filter, http, reject};

/// Largest JSON body any endpoint accepts.
const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Reads are public for every record type. Every write needs a bearer access token.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ctx = with_context(server.cancel_token());

    // region session

    let sign_up = warp::post()
        .and(warp::path("sign-up"))
        .and(warp::path::end())
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::sign_up);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(json_body())
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("logout"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(ctx.clone())
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    // endregion

    // region principals

    let list_principals = warp::get()
        .and(warp::path("principals"))
        .and(warp::path::end())
        .and(ctx.clone())
        .and(with(server.principal_service.clone()))
        .and_then(handler::list_principals);

    let get_principal = warp::get()
        .and(warp::path("principals"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(ctx.clone())
        .and(with(server.principal_service.clone()))
        .and_then(handler::get_principal);

    let update_principal = warp::put()
        .and(warp::path("principals"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(json_body())
        .and(with_verification(server.auth_service.clone()))
        .and(ctx.clone())
        .and(with(server.principal_service.clone()))
        .and_then(handler::update_principal);

    let delete_principal = warp::delete()
        .and(warp::path("principals"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(ctx.clone())
        .and(with(server.principal_service.clone()))
        .and_then(handler::delete_principal);

    // endregion

    // region adverts

    let create_advert = warp::post()
        .and(warp::path("adverts"))
        .and(warp::path::end())
        .and(json_body())
        .and(with_verification(server.auth_service.clone()))
        .and(ctx.clone())
        .and(with(server.advert_service.clone()))
        .and_then(handler::create_advert);

    let list_adverts = warp::get()
        .and(warp::path("adverts"))
        .and(warp::path::end())
        .and(ctx.clone())
        .and(with(server.advert_service.clone()))
        .and_then(handler::list_adverts);

    let get_advert = warp::get()
        .and(warp::path("adverts"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(ctx.clone())
        .and(with(server.advert_service.clone()))
        .and_then(handler::get_advert);

    let update_advert = warp::put()
        .and(warp::path("adverts"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(json_body())
        .and(with_verification(server.auth_service.clone()))
        .and(ctx.clone())
        .and(with(server.advert_service.clone()))
        .and_then(handler::update_advert);

    let delete_advert = warp::delete()
        .and(warp::path("adverts"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(with_verification(server.auth_service.clone()))
        .and(ctx)
        .and(with(server.advert_service.clone()))
        .and_then(handler::delete_advert);

    // endregion

    let session = sign_up.or(login).or(refresh).or(logout);
    let principals = list_principals
        .or(get_principal)
        .or(update_principal)
        .or(delete_principal);
    let adverts = create_advert
        .or(list_adverts)
        .or(get_advert)
        .or(update_advert)
        .or(delete_advert);

    session.or(principals).or(adverts)
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// A fresh call context per request, cancelled when the server shuts down.
fn with_context(
    shutdown: CancellationToken,
) -> impl Filter<Extract = (CallContext,), Error = Infallible> + Clone {
    warp::any().map(move || CallContext::with_token(shutdown.child_token()))
}

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (TokenSubject,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                auth_service
                    .verify_access(token)
                    .await
                    .map_err(|e| reject::custom(ApiFailure::from(e)))
            } else {
                Err(reject::custom(ApiFailure::unauthorized()))
            }
        }
    })
}
