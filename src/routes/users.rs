/// User Routes
///
/// Profile CRUD for authenticated callers. Hash columns never leave the
/// persistence layer through these responses.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{store, AuthenticatedUser};
use crate::error::{AppError, DatabaseError};
use crate::validators::is_valid_email;

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

impl From<store::User> for UserResponse {
    fn from(user: store::User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct EditUserRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// GET /users
///
/// List user profiles.
pub async fn get_users(pool: web::Data<PgPool>) -> Result<HttpResponse, AppError> {
    let users = sqlx::query_as::<_, store::User>(
        r#"
        SELECT id, email, password_hash, refresh_token_hash,
               first_name, last_name, created_at, updated_at
        FROM users
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    let response: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// GET /users/me
///
/// The caller's own profile.
///
/// # Errors
/// - 404: the authenticated id no longer resolves to a row
pub async fn get_me(
    auth: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = store::find_user_by_id(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| AppError::Database(DatabaseError::NotFound("user".to_string())))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PATCH /users
///
/// Partial update of the caller's profile. Absent fields keep their current
/// value.
///
/// # Errors
/// - 400: malformed email
/// - 404: the authenticated id no longer resolves to a row
/// - 409: new email already taken
pub async fn edit_user(
    form: web::Json<EditUserRequest>,
    auth: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let email = match form.email.as_deref() {
        Some(raw) => Some(is_valid_email(raw)?),
        None => None,
    };

    let user = sqlx::query_as::<_, store::User>(
        r#"
        UPDATE users
        SET email = COALESCE($1, email),
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            updated_at = $4
        WHERE id = $5
        RETURNING id, email, password_hash, refresh_token_hash,
                  first_name, last_name, created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(form.first_name.as_deref())
    .bind(form.last_name.as_deref())
    .bind(Utc::now())
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("user".to_string())))?;

    tracing::info!(user_id = %user.id, "User profile updated");
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
