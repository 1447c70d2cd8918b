use reqwest::StatusCode;
use serde::Deserialize;
use std::borrow::Cow;
use thiserror::Error as ThisError;

/// Errors raised while talking to the hosted backend or loading configuration.
#[derive(Debug, ThisError)]
pub enum NeatifyError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("Backend error with status {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("missing or malformed Content-Range header in count response")]
    MissingCount,
}

impl From<figment::Error> for NeatifyError {
    fn from(e: figment::Error) -> Self {
        NeatifyError::Config(Box::new(e))
    }
}

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for NeatifyError {
    fn is_retryable(&self) -> bool {
        match self {
            NeatifyError::Reqwest(e) => e.is_timeout() || e.is_connect(),
            NeatifyError::Api { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Error body shapes returned by GoTrue, PostgREST and Storage.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct BackendErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl BackendErrorBody {
    /// Pick the most descriptive message out of a raw error body.
    pub(crate) fn message_from(body: &str, status: StatusCode) -> String {
        let parsed: BackendErrorBody = serde_json::from_str(body).unwrap_or_default();
        parsed
            .error_description
            .or(parsed.msg)
            .or(parsed.message)
            .or(parsed.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            })
    }
}

/// Failures reported by an identity provider.
#[derive(Debug, ThisError)]
pub enum ProviderError {
    #[error("{reason}")]
    Rejected { reason: String },

    #[error(transparent)]
    Backend(#[from] NeatifyError),
}

impl ProviderError {
    /// Reason suitable for showing to the person signing in.
    pub fn reason(&self) -> String {
        match self {
            ProviderError::Rejected { reason } => reason.clone(),
            ProviderError::Backend(e) => e.to_string(),
        }
    }
}

/// Outcome of a device verification challenge that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ChallengeError {
    #[error("challenge cancelled")]
    Cancelled,

    #[error("challenge failed")]
    Failed,

    #[error("device security subsystem error: {0}")]
    Unavailable(String),
}

/// Failure kinds of the sign-in handshake.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum AuthError {
    #[error("email and password required")]
    MissingCredentials,

    #[error("primary authentication failed: {0}")]
    PrimaryAuthFailed(String),

    #[error("device security unavailable")]
    DeviceSecurityUnavailable,

    #[error("device verification failed")]
    DeviceVerificationFailed,
}

impl AuthError {
    pub fn title(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Error",
            AuthError::PrimaryAuthFailed(_) => "Login Failed",
            AuthError::DeviceSecurityUnavailable => "Security Required",
            AuthError::DeviceVerificationFailed => "Verification Failed",
        }
    }

    pub fn user_message(&self) -> Cow<'_, str> {
        match self {
            AuthError::MissingCredentials => Cow::Borrowed("Email and password required"),
            AuthError::PrimaryAuthFailed(reason) => Cow::Borrowed(reason.as_str()),
            AuthError::DeviceSecurityUnavailable => Cow::Borrowed(
                "Please enable fingerprint, face ID, or device PIN to continue.",
            ),
            AuthError::DeviceVerificationFailed => {
                Cow::Borrowed("Security verification is required to continue.")
            }
        }
    }
}
