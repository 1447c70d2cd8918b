use crate::config::Config;
use crate::error::{BackendErrorBody, NeatifyError};
use backon::ExponentialBuilder;
use reqwest::{Method, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub(crate) fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// Shared HTTP plumbing for the auth, rest and storage endpoints.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: Arc<str>,
}

impl SupabaseClient {
    pub fn new(cfg: &Config) -> Result<Self, NeatifyError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("neatify-staff/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()?;

        // `Url::join` replaces the last segment unless the base ends in '/'.
        let mut base_url = cfg.supabase_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            anon_key: Arc::from(cfg.anon_key.as_str()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, NeatifyError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Request carrying the project key, authorized as `bearer` when given
    /// and as the anonymous role otherwise.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<RequestBuilder, NeatifyError> {
        let url = self.endpoint(path)?;
        Ok(self
            .http
            .request(method, url)
            .header("apikey", &*self.anon_key)
            .bearer_auth(bearer.unwrap_or(&*self.anon_key)))
    }

    /// Send and turn any non-2xx status into [`NeatifyError::Api`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, NeatifyError> {
        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = BackendErrorBody::message_from(&body, status);
        debug!(status = %status, message = %message, "backend returned error status");
        Err(NeatifyError::Api { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(base: &str) -> SupabaseClient {
        let cfg = Config {
            supabase_url: Url::parse(base).unwrap(),
            anon_key: "anon".into(),
            ..Config::default()
        };
        SupabaseClient::new(&cfg).unwrap()
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let client = client_for("https://gateway.example.com/project");
        assert_eq!(
            client.endpoint("/rest/v1/bookings").unwrap().as_str(),
            "https://gateway.example.com/project/rest/v1/bookings"
        );
    }

    #[test]
    fn endpoint_on_bare_host() {
        let client = client_for("https://abc.supabase.co");
        assert_eq!(
            client.endpoint("auth/v1/logout").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/logout"
        );
    }
}
