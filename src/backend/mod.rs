//! HTTP access to the hosted backend: auth, tables and file storage.

pub mod auth;
pub mod client;

pub use auth::SupabaseAuth;
pub use client::SupabaseClient;
