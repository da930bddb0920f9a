/// Session Store
///
/// Persistence for user records and the per-user refresh-token hash. The
/// `refresh_token_hash` column is the single source of truth for whether a
/// refresh token is still valid: NULL means no active session.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create a user row.
///
/// # Errors
/// `DatabaseError::UniqueConstraintViolation` if the email is taken (unique
/// constraint on `users.email`).
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, email, password_hash, refresh_token_hash,
                  first_name, last_name, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, refresh_token_hash,
               first_name, last_name, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, refresh_token_hash,
               first_name, last_name, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Overwrite the stored refresh-token hash for a user.
///
/// Idempotent; `None` clears the session. Writing a new hash invalidates
/// whatever token the previous hash belonged to.
pub async fn set_refresh_token_hash(
    pool: &PgPool,
    user_id: Uuid,
    hash: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET refresh_token_hash = $1, updated_at = now()
        WHERE id = $2
        "#,
    )
    .bind(hash)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear the refresh-token hash where one is set.
///
/// Returns how many rows changed; an unknown id or an already logged-out
/// session simply touches nothing.
pub async fn clear_refresh_token_hash(pool: &PgPool, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET refresh_token_hash = NULL, updated_at = now()
        WHERE id = $1 AND refresh_token_hash IS NOT NULL
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
