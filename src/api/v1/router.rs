use super::error::*;
use super::handler;
use crate::application_port::AuthService;
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

/// Request bodies above this size are rejected before parsing.
const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let signup = warp::post()
        .and(warp::path!("auth" / "signup"))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signup);

    let signin = warp::post()
        .and(warp::path!("auth" / "signin"))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signin);

    let refresh = warp::post()
        .and(warp::path!("auth" / "refresh"))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let signout = warp::post()
        .and(warp::path!("auth" / "signout"))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::signout);

    let whoami = warp::get()
        .and(warp::path!("auth" / "whoami"))
        .and(with_verification(server.auth_service.clone()))
        .and_then(handler::whoami);

    signup.or(signin).or(refresh).or(signout).or(whoami)
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

fn with_verification(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::<String>(http::header::AUTHORIZATION.as_ref()).and_then(move |token: String| {
        let auth_service = auth_service.clone();
        async move {
            if let Some(token) = token.strip_prefix("Bearer ") {
                let user_id = auth_service
                    .authenticate(token)
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)?;
                Ok(user_id)
            } else {
                Err(reject::custom(ApiErrorCode::InvalidToken))
            }
        }
    })
}
