/// Donation Routes
///
/// The donation ledger: authenticated callers record donations and read back
/// their own, with per-allocation totals.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, ValidationError};

#[derive(Deserialize)]
pub struct MakeDonationRequest {
    pub amount: i64,
    pub allocation: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Donation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub allocation: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct AllocationTotal {
    pub allocation: String,
    pub total: i64,
}

#[derive(Serialize)]
pub struct DonationsResponse {
    pub donations: Vec<Donation>,
    pub total_by_allocation: Vec<AllocationTotal>,
}

/// POST /donations
///
/// Record a donation for the caller.
///
/// # Errors
/// - 400: non-positive amount or empty allocation
pub async fn make_donation(
    form: web::Json<MakeDonationRequest>,
    auth: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    if form.amount <= 0 {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "amount".to_string(),
        )));
    }

    let allocation = form.allocation.trim();
    if allocation.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "allocation".to_string(),
        )));
    }

    let donation = sqlx::query_as::<_, Donation>(
        r#"
        INSERT INTO donations (id, user_id, amount, allocation)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, amount, allocation, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth.user_id)
    .bind(form.amount)
    .bind(allocation)
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(
        user_id = %auth.user_id,
        donation_id = %donation.id,
        "Donation recorded"
    );

    Ok(HttpResponse::Created().json(donation))
}

/// GET /donations
///
/// The caller's donations plus their sums grouped by allocation.
pub async fn get_user_donations(
    auth: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let donations = sqlx::query_as::<_, Donation>(
        r#"
        SELECT id, user_id, amount, allocation, created_at
        FROM donations
        WHERE user_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    let totals = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT allocation, SUM(amount)::BIGINT
        FROM donations
        WHERE user_id = $1
        GROUP BY allocation
        ORDER BY allocation
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    let total_by_allocation = totals
        .into_iter()
        .map(|(allocation, total)| AllocationTotal { allocation, total })
        .collect();

    Ok(HttpResponse::Ok().json(DonationsResponse {
        donations,
        total_by_allocation,
    }))
}
