use crate::auth::{ChallengePrompt, DeviceSecurity};
use crate::error::ChallengeError;
use async_trait::async_trait;
use dialoguer::Password;
use std::io::{ErrorKind, IsTerminal};
use subtle::ConstantTimeEq;
use tracing::debug;

/// Device PIN verification on an interactive terminal.
///
/// The terminal is the "hardware"; a configured PIN is the enrollment.
/// An empty answer or end of input counts as cancelling the challenge.
pub struct TerminalPin {
    pin: Option<String>,
}

impl TerminalPin {
    pub fn new(pin: Option<String>) -> Self {
        Self { pin }
    }

    fn verify_pin(&self, entered: &str) -> bool {
        match self.pin.as_deref() {
            Some(expected) if !expected.is_empty() => {
                entered.as_bytes().ct_eq(expected.as_bytes()).into()
            }
            _ => false,
        }
    }

    /// Map what the prompt returned to the challenge outcome.
    fn settle(&self, answer: Result<String, dialoguer::Error>) -> Result<(), ChallengeError> {
        let entered = match answer {
            Ok(entered) => entered,
            Err(dialoguer::Error::IO(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(ChallengeError::Cancelled);
            }
            Err(e) => return Err(ChallengeError::Unavailable(e.to_string())),
        };
        if entered.is_empty() {
            return Err(ChallengeError::Cancelled);
        }
        if self.verify_pin(&entered) {
            debug!("device PIN accepted");
            Ok(())
        } else {
            Err(ChallengeError::Failed)
        }
    }
}

#[async_trait]
impl DeviceSecurity for TerminalPin {
    async fn has_hardware(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    async fn is_enrolled(&self) -> bool {
        self.pin.as_deref().is_some_and(|p| !p.is_empty())
    }

    async fn challenge(&self, prompt: &ChallengePrompt) -> Result<(), ChallengeError> {
        let text = format!(
            "{} [{}, empty to {}]",
            prompt.message, prompt.fallback_label, prompt.cancel_label
        );
        let answer = tokio::task::spawn_blocking(move || {
            Password::new()
                .with_prompt(text)
                .allow_empty_password(true)
                .interact()
        })
        .await
        .map_err(|e| ChallengeError::Unavailable(e.to_string()))?;
        self.settle(answer)
    }
}
