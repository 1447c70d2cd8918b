//! Sign-in for staff members.
//!
//! A session becomes usable only after two independent checks pass: the
//! identity provider accepts the email/password pair, and the holder of the
//! device re-verifies with a biometric or device PIN. [`handshake`] chains the
//! two and tears the provider session down again if the second check fails.

pub mod handshake;

use crate::error::{ChallengeError, ProviderError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use handshake::AuthHandshake;

/// A credential holder the identity provider has signed in.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify the pair and open a remote session for it.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    /// Terminate the remote session opened by the last successful `sign_in`.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

#[async_trait]
impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        (**self).sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        (**self).sign_out().await
    }
}

/// Local biometric / PIN subsystem of the device.
#[async_trait]
pub trait DeviceSecurity: Send + Sync {
    async fn has_hardware(&self) -> bool;

    async fn is_enrolled(&self) -> bool;

    /// Interactive verification of the person holding the device.
    async fn challenge(&self, prompt: &ChallengePrompt) -> Result<(), ChallengeError>;
}

/// Text shown by the device while it asks for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengePrompt {
    pub message: String,
    pub fallback_label: String,
    pub cancel_label: String,
}

impl Default for ChallengePrompt {
    fn default() -> Self {
        Self {
            message: "Verify to access Neatify Staff".to_string(),
            fallback_label: "Use Device PIN".to_string(),
            cancel_label: "Cancel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// The provider accepted the credentials; device not yet verified.
    PrimaryVerified,
    Verified,
    /// A primary session existed and was terminated after a failed device check.
    TornDown,
}

/// Outcome of one sign-in attempt.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    identity: Option<Identity>,
    device_verified: bool,
    state: SessionState,
}

impl AuthSession {
    pub(crate) fn primary_verified(&mut self, identity: Identity) {
        self.identity = Some(identity);
        self.state = SessionState::PrimaryVerified;
    }

    pub(crate) fn device_verified(&mut self) {
        debug_assert_eq!(self.state, SessionState::PrimaryVerified);
        self.device_verified = true;
        self.state = SessionState::Verified;
    }

    pub(crate) fn tear_down(&mut self) {
        self.identity = None;
        self.device_verified = false;
        self.state = SessionState::TornDown;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_device_verified(&self) -> bool {
        self.device_verified
    }

    /// Usable iff both the provider and the device checks passed.
    pub fn is_usable(&self) -> bool {
        self.state == SessionState::Verified && self.device_verified && self.identity.is_some()
    }

    /// The signed-in identity, only once the session is usable.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref().filter(|_| self.is_usable())
    }
}
