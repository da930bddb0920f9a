/// Token Validation Middleware
///
/// Validates the Bearer token from the Authorization header against the
/// secret of the endpoint's token class and attaches an `AuthenticatedUser`
/// to the request. Handlers behind this middleware never see an invalid or
/// missing token; those requests are rejected here with 401.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{validate_token, AuthenticatedUser, TokenKind};
use crate::configuration::JwtSettings;

/// Guards a scope with one of the two token classes.
///
/// `JwtMiddleware::access` protects ordinary API endpoints;
/// `JwtMiddleware::refresh` protects the token-refresh endpoint and keeps the
/// raw refresh token on the request identity so the orchestrator can verify
/// it against the stored hash.
pub struct JwtMiddleware {
    kind: TokenKind,
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn access(jwt_config: JwtSettings) -> Self {
        Self {
            kind: TokenKind::Access,
            jwt_config,
        }
    }

    pub fn refresh(jwt_config: JwtSettings) -> Self {
        Self {
            kind: TokenKind::Refresh,
            jwt_config,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            kind: self.kind,
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    kind: TokenKind,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string);

        let token = match bearer {
            Some(token) => token,
            None => {
                tracing::warn!("Missing or invalid Authorization header");
                let response = HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "Missing or invalid authorization header",
                    "code": "UNAUTHORIZED"
                }));
                return Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Unauthorized",
                        response,
                    )
                    .into())
                });
            }
        };

        let claims = match validate_token(&token, self.kind, &self.jwt_config) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(kind = ?self.kind, "Token validation failed: {}", e);
                let response = HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "Invalid or expired token",
                    "code": "TOKEN_INVALID"
                }));
                return Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Invalid token",
                        response,
                    )
                    .into())
                });
            }
        };

        let user_id = match claims.user_id() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!("Token subject is not a valid user id");
                let response = HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "Invalid or expired token",
                    "code": "TOKEN_INVALID"
                }));
                return Box::pin(async move {
                    Err(actix_web::error::InternalError::from_response(
                        "Invalid token",
                        response,
                    )
                    .into())
                });
            }
        };

        let authenticated = AuthenticatedUser {
            user_id,
            email: claims.email.clone(),
            // The raw token only matters on the refresh endpoint, where the
            // orchestrator checks it against the stored hash.
            refresh_token: match self.kind {
                TokenKind::Refresh => Some(token),
                TokenKind::Access => None,
            },
        };

        req.extensions_mut().insert(authenticated);

        tracing::debug!(
            user_id = %user_id,
            email = %claims.email,
            kind = ?self.kind,
            "Token validated"
        );

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
