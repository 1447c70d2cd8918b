#![allow(dead_code)]

use neatify_staff::auth::Identity;
use neatify_staff::config::Config;
use neatify_staff::SupabaseClient;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const ANON_KEY: &str = "anon-test-key";
pub const USER_ID: &str = "5b0d7c1e-user";
pub const EMAIL: &str = "staff@x.com";
pub const ACCESS_TOKEN: &str = "access-token-1";

pub fn client_for(server: &MockServer) -> SupabaseClient {
    let cfg = Config {
        supabase_url: server.uri().parse().expect("mock server uri"),
        anon_key: ANON_KEY.to_string(),
        ..Config::default()
    };
    SupabaseClient::new(&cfg).expect("failed to build client")
}

pub fn identity() -> Identity {
    Identity {
        user_id: USER_ID.to_string(),
        email: EMAIL.to_string(),
        access_token: ACCESS_TOKEN.to_string(),
        expires_at: None,
    }
}

pub fn token_body() -> Value {
    json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1_900_000_000,
        "refresh_token": "refresh-1",
        "user": { "id": USER_ID, "email": EMAIL }
    })
}
