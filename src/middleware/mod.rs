/// Middleware module
///
/// Token validation and request logging.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
