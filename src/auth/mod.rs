/// Authentication module
///
/// Token generation/validation, password and refresh-token hashing, the
/// session store, and the orchestrator tying them together.

mod claims;
mod jwt;
mod password;
mod refresh_token;
pub mod service;
pub mod store;

pub use claims::{AuthenticatedUser, Claims};
pub use jwt::{generate_token_pair, validate_token, TokenKind, TokenPair};
pub use password::{hash_password, verify_password};
pub use refresh_token::{hash_refresh_token, verify_refresh_token};
