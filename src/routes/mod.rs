mod auth;
mod donations;
mod health_check;
mod users;

pub use auth::{logout, refresh, signin, signup};
pub use donations::{get_user_donations, make_donation};
pub use health_check::health_check;
pub use users::{edit_user, get_me, get_users};
