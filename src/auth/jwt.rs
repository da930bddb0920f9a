/// Token Issuer
///
/// Mints and validates the two token classes. Both are HS256 JWTs carrying
/// the same claims; an access token is signed with the access secret and
/// lives 15 minutes, a refresh token with the refresh secret for 7 days.
/// A token of one class never validates against the other's secret.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// The pair returned by every successful signup, signin, and refresh.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Selects which secret and expiry a token is signed or validated with.
/// Endpoints pick their validator class explicitly through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret<'a>(&self, config: &'a JwtSettings) -> &'a str {
        match self {
            TokenKind::Access => &config.access_secret,
            TokenKind::Refresh => &config.refresh_secret,
        }
    }

    fn expiry_seconds(&self, config: &JwtSettings) -> i64 {
        match self {
            TokenKind::Access => config.access_token_expiry,
            TokenKind::Refresh => config.refresh_token_expiry,
        }
    }
}

fn generate_token(
    user_id: &Uuid,
    email: &str,
    kind: TokenKind,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        email.to_string(),
        kind.expiry_seconds(config),
        config.issuer.clone(),
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(kind.secret(config).as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Generate an access/refresh token pair for a user.
///
/// The two tokens have no data dependency on each other; both must be minted
/// before the pair is returned.
pub fn generate_token_pair(
    user_id: &Uuid,
    email: &str,
    config: &JwtSettings,
) -> Result<TokenPair, AppError> {
    let access_token = generate_token(user_id, email, TokenKind::Access, config)?;
    let refresh_token = generate_token(user_id, email, TokenKind::Refresh, config)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Validate a token against the secret of its asserted class.
///
/// # Errors
/// `TokenExpired` for expired tokens; `TokenInvalid` for signature mismatch
/// (including a token of the wrong class), wrong issuer, or garbage input.
pub fn validate_token(
    token: &str,
    kind: TokenKind,
    config: &JwtSettings,
) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(kind.secret(config).as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!(kind = ?kind, "JWT validation error: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Auth(AuthError::TokenExpired)
            }
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })
}
