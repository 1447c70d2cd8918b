use crate::auth::ChallengePrompt;
use crate::error::NeatifyError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "NEATIFY_";

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the hosted backend project.
    pub supabase_url: Url,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    pub loglevel: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Storage bucket holding staff avatars.
    pub avatar_bucket: String,
    /// PIN enrolled on this device. Without it device verification is unavailable.
    pub device_pin: Option<String>,
    pub maps_base_url: Url,
    pub prompt: ChallengePrompt,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supabase_url: Url::parse("http://localhost:54321/").expect("static url"),
            anon_key: String::new(),
            loglevel: "info".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 15,
            avatar_bucket: "avatars".to_string(),
            device_pin: None,
            maps_base_url: Url::parse("https://www.google.com/maps/search/").expect("static url"),
            prompt: ChallengePrompt::default(),
        }
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `NEATIFY_*` environment variables.
    /// Nested keys use a double underscore, e.g. `NEATIFY_PROMPT__MESSAGE`.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, NeatifyError> {
        Ok(Self::figment().extract()?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("supabase_url", &self.supabase_url.as_str())
            .field("loglevel", &self.loglevel)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("avatar_bucket", &self.avatar_bucket)
            .field("device_pin", &self.device_pin.as_ref().map(|_| "<set>"))
            .field("maps_base_url", &self.maps_base_url.as_str())
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}
