use super::{AuthSession, ChallengePrompt, DeviceSecurity, IdentityProvider};
use crate::error::{AuthError, ChallengeError};
use tracing::{debug, info, warn};

/// Password sign-in followed by mandatory device re-verification.
///
/// The two stages are atomic from the caller's point of view: either both
/// succeed and a usable [`AuthSession`] is returned, or the remote session
/// opened by the first stage is terminated before the error is returned.
/// Nothing is retried; callers start over from [`AuthHandshake::authenticate`].
pub struct AuthHandshake<P, D> {
    provider: P,
    device: D,
    prompt: ChallengePrompt,
}

impl<P, D> AuthHandshake<P, D>
where
    P: IdentityProvider,
    D: DeviceSecurity,
{
    pub fn new(provider: P, device: D) -> Self {
        Self::with_prompt(provider, device, ChallengePrompt::default())
    }

    pub fn with_prompt(provider: P, device: D, prompt: ChallengePrompt) -> Self {
        Self {
            provider,
            device,
            prompt,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let mut session = AuthSession::default();

        let identity = self
            .provider
            .sign_in(email, password)
            .await
            .map_err(|e| {
                warn!(email = %email, error = %e, "primary authentication rejected");
                AuthError::PrimaryAuthFailed(e.reason())
            })?;
        debug!(user_id = %identity.user_id, "primary authentication accepted");
        session.primary_verified(identity);

        if let Err(failure) = self.verify_device().await {
            self.terminate(&mut session, &failure).await;
            return Err(failure);
        }

        session.device_verified();
        info!(email = %email, "staff session verified");
        Ok(session)
    }

    async fn verify_device(&self) -> Result<(), AuthError> {
        let has_hardware = self.device.has_hardware().await;
        let enrolled = self.device.is_enrolled().await;
        if !has_hardware || !enrolled {
            warn!(has_hardware, enrolled, "device security unavailable");
            return Err(AuthError::DeviceSecurityUnavailable);
        }

        match self.device.challenge(&self.prompt).await {
            Ok(()) => Ok(()),
            Err(ChallengeError::Cancelled) => {
                info!("device verification cancelled");
                Err(AuthError::DeviceVerificationFailed)
            }
            Err(e) => {
                warn!(error = %e, "device verification failed");
                Err(AuthError::DeviceVerificationFailed)
            }
        }
    }

    /// Compensating sign-out. Errors are logged and absorbed so the caller
    /// always sees the failure that triggered the teardown.
    async fn terminate(&self, session: &mut AuthSession, cause: &AuthError) {
        match self.provider.sign_out().await {
            Ok(()) => debug!(cause = %cause, "provider session terminated"),
            Err(e) => warn!(
                cause = %cause,
                error = %e,
                "failed to terminate provider session after device check"
            ),
        }
        session.tear_down();
    }
}
