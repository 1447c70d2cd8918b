pub mod auth;
pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod staff;

pub use auth::{AuthHandshake, AuthSession, Identity};
pub use backend::{SupabaseAuth, SupabaseClient};
pub use error::{AuthError, NeatifyError};
