/// Authentication Routes
///
/// Thin handlers over the auth orchestrator: signup, signin, logout, and
/// token refresh.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{service, AuthenticatedUser};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Credential payload for signup and signin
#[derive(Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/signup
///
/// Register with email and password; returns a token pair on success.
///
/// # Errors
/// - 400: malformed email or password outside length bounds
/// - 403: credentials rejected (including an already registered email)
pub async fn signup(
    form: web::Json<AuthRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let tokens = service::signup(
        pool.get_ref(),
        jwt_config.get_ref(),
        &form.email,
        &form.password,
    )
    .await?;

    Ok(HttpResponse::Created().json(tokens))
}

/// POST /auth/signin
///
/// Authenticate with email and password; returns a fresh token pair and
/// replaces any previously active session.
///
/// # Errors
/// - 403: unknown email or wrong password, indistinguishable by design
pub async fn signin(
    form: web::Json<AuthRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let tokens = service::signin(
        pool.get_ref(),
        jwt_config.get_ref(),
        &form.email,
        &form.password,
    )
    .await?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
///
/// Requires a valid access token. Clears the caller's stored refresh-token
/// hash; refreshing with any previously issued token fails afterwards.
pub async fn logout(
    auth: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let result = service::logout(pool.get_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(result))
}

/// POST /auth/refresh
///
/// Requires a valid refresh token in the Authorization header. Issues a new
/// pair and rotates the stored hash; the presented token is single-use.
///
/// # Errors
/// - 401: missing/invalid/expired refresh token (rejected by the guard)
/// - 403: token does not match the current session (logged out or superseded)
pub async fn refresh(
    auth: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = auth
        .refresh_token
        .as_deref()
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let tokens = service::refresh_tokens(
        pool.get_ref(),
        jwt_config.get_ref(),
        auth.user_id,
        refresh_token,
    )
    .await?;

    Ok(HttpResponse::Ok().json(tokens))
}
