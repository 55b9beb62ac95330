pub mod auth;
mod manager;

pub use auth::{CredentialsHasher, SessionToken, TokenValue};
pub use manager::UserManager;
