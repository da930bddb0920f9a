/// JWT claims and the request-scoped identity they resolve to.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// JWT claims shared by access and refresh tokens (RFC 7519).
///
/// The two token classes carry the same payload; they differ only in signing
/// secret and expiry. `jti` is a fresh UUID per token, so two tokens minted
/// for the same user within the same second are still distinct strings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Token ID
    pub jti: String,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract the user ID from the subject claim.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }
}

/// The identity attached to a request by the token-validation middleware.
///
/// `refresh_token` holds the raw refresh token only on the refresh endpoint,
/// where the orchestrator needs it to verify against the stored hash. It
/// lives for the duration of one request and is never persisted.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub refresh_token: Option<String>,
}
