use super::client::SupabaseClient;
use crate::auth::{Identity, IdentityProvider};
use crate::error::{NeatifyError, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const TOKEN_PATH: &str = "auth/v1/token";
const LOGOUT_PATH: &str = "auth/v1/logout";

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Deserialize, Debug)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Password sign-in against the hosted auth service.
///
/// Holds the session it opened so `sign_out` can revoke it later.
pub struct SupabaseAuth {
    client: SupabaseClient,
    session: RwLock<Option<Identity>>,
}

impl SupabaseAuth {
    pub fn new(client: SupabaseClient) -> Self {
        Self {
            client,
            session: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &SupabaseClient {
        &self.client
    }

    pub async fn current_identity(&self) -> Option<Identity> {
        self.session.read().await.clone()
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let already_held = self.session.read().await.is_some();
        if already_held {
            debug!("revoking previously held session before a new sign-in");
            if let Err(e) = self.sign_out().await {
                warn!(error = %e, "previous session could not be revoked");
            }
        }

        let request = self
            .client
            .request(Method::POST, TOKEN_PATH, None)?
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });

        let resp = match self.client.send(request).await {
            Ok(resp) => resp,
            Err(NeatifyError::Api { status, message }) if status.is_client_error() => {
                return Err(ProviderError::Rejected { reason: message });
            }
            Err(e) => return Err(e.into()),
        };
        let payload: Value = resp.json().await.map_err(NeatifyError::from)?;

        // Hold the token as soon as it is known so the remote session can be
        // revoked even when the rest of the payload is unusable.
        if let Some(access_token) = payload.get("access_token").and_then(Value::as_str) {
            *self.session.write().await = Some(Identity {
                user_id: String::new(),
                email: email.to_string(),
                access_token: access_token.to_string(),
                expires_at: None,
            });
        }

        let token: TokenResponse = match serde_json::from_value(payload) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "malformed token response");
                if let Err(revoke) = self.sign_out().await {
                    warn!(error = %revoke, "failed to revoke session from malformed response");
                }
                return Err(NeatifyError::from(e).into());
            }
        };

        let identity = Identity {
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
            access_token: token.access_token,
            expires_at: token
                .expires_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        };
        info!(user_id = %identity.user_id, "password sign-in accepted");

        *self.session.write().await = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        // The local session is dropped even if revocation fails remotely.
        let Some(identity) = self.session.write().await.take() else {
            debug!("sign-out requested without an active session");
            return Ok(());
        };

        let request = self
            .client
            .request(Method::POST, LOGOUT_PATH, Some(identity.access_token.as_str()))?;
        self.client.send(request).await.map_err(|e| {
            warn!(user_id = %identity.user_id, error = %e, "remote sign-out failed");
            ProviderError::from(e)
        })?;

        info!(user_id = %identity.user_id, "signed out");
        Ok(())
    }
}
