use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
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

/// Service failures become custom rejections, rendered by `recover_error`.
fn rejection(error: AuthError) -> warp::Rejection {
    reject::custom(ApiErrorCode::from(error))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

pub async fn signup(
    body: CredentialsRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signup_input = SignupInput {
        username: body.username,
        password: body.password,
    };
    let user_id = auth_service
        .signup(signup_input)
        .await
        .map_err(rejection)?;

    Ok(warp::reply::json(&ApiResponse::ok(SignupResponse { user_id })))
}

#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

pub async fn signin(
    body: CredentialsRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let signin_input = SigninInput {
        username: body.username,
        password: body.password,
    };
    let result = auth_service
        .signin(signin_input)
        .await
        .map_err(rejection)?;

    let response = SigninResponse {
        user_id: result.user_id,
        tokens: result.tokens,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(&body.refresh_token)
        .await
        .map_err(rejection)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}

#[derive(Debug, Deserialize)]
pub struct SignoutRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignoutResponse;

pub async fn signout(
    body: SignoutRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .signout(&body.access_token)
        .await
        .map_err(rejection)?;

    Ok(warp::reply::json(&ApiResponse::ok(SignoutResponse)))
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub user_id: UserId,
}

pub async fn whoami(user_id: UserId) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&ApiResponse::ok(WhoamiResponse { user_id })))
}
