/// Auth Orchestrator
///
/// The session state machine: per account, `refresh_token_hash = NULL` means
/// no active session, a stored hash means an active one. signup, signin, and
/// refresh all end by writing the new refresh token's hash — that write is
/// the commit point, so tokens are only returned once they are durably
/// recorded. Every credential-class failure maps to the single
/// `InvalidCredentials` error.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::jwt::{generate_token_pair, TokenPair};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{hash_refresh_token, verify_refresh_token};
use crate::auth::store;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError};

/// Register a new account and open a session.
///
/// A duplicate email surfaces as `InvalidCredentials`, not as a
/// duplicate-specific error, so responses do not confirm which emails are
/// registered.
pub async fn signup(
    pool: &PgPool,
    jwt_config: &JwtSettings,
    email: &str,
    password: &str,
) -> Result<TokenPair, AppError> {
    let email = crate::validators::is_valid_email(email)?;
    let password_hash = hash_password(password)?;

    let user = store::create_user(pool, &email, &password_hash)
        .await
        .map_err(|e| match e {
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                AppError::Auth(AuthError::InvalidCredentials)
            }
            other => other,
        })?;

    let tokens = generate_token_pair(&user.id, &user.email, jwt_config)?;
    persist_session(pool, user.id, &tokens).await?;

    tracing::info!(user_id = %user.id, "User signed up");
    Ok(tokens)
}

/// Authenticate with email and password and open a session.
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn signin(
    pool: &PgPool,
    jwt_config: &JwtSettings,
    email: &str,
    password: &str,
) -> Result<TokenPair, AppError> {
    let user = store::find_user_by_email(pool, email)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let tokens = generate_token_pair(&user.id, &user.email, jwt_config)?;
    persist_session(pool, user.id, &tokens).await?;

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(tokens)
}

/// Terminate the account's session by clearing the stored hash.
///
/// Idempotent: logging out an unknown id or an already closed session is a
/// silent no-op.
pub async fn logout(pool: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
    let cleared = store::clear_refresh_token_hash(pool, user_id).await?;

    if cleared > 0 {
        tracing::info!(user_id = %user_id, "User logged out");
    }
    Ok(true)
}

/// Exchange a valid refresh token for a new pair, rotating the stored hash.
///
/// Fails with `InvalidCredentials` when the account is unknown, has no active
/// session (logged out), or the presented token does not match the stored
/// hash — including a token already superseded by a later refresh.
pub async fn refresh_tokens(
    pool: &PgPool,
    jwt_config: &JwtSettings,
    user_id: Uuid,
    refresh_token: &str,
) -> Result<TokenPair, AppError> {
    let user = store::find_user_by_id(pool, user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let stored_hash = user
        .refresh_token_hash
        .as_deref()
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    if !verify_refresh_token(stored_hash, refresh_token) {
        tracing::warn!(user_id = %user_id, "Refresh token failed hash verification");
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let tokens = generate_token_pair(&user.id, &user.email, jwt_config)?;
    persist_session(pool, user.id, &tokens).await?;

    tracing::info!(user_id = %user_id, "Tokens rotated");
    Ok(tokens)
}

/// Hash the pair's refresh token and store it, replacing any previous hash.
/// Runs after issuance; if the write fails the whole operation fails.
async fn persist_session(
    pool: &PgPool,
    user_id: Uuid,
    tokens: &TokenPair,
) -> Result<(), AppError> {
    let hash = hash_refresh_token(&tokens.refresh_token)?;
    store::set_refresh_token_hash(pool, user_id, Some(&hash)).await
}
