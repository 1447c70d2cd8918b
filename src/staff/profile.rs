use crate::auth::Identity;
use crate::backend::SupabaseClient;
use crate::backend::client::default_retry_policy;
use crate::error::{IsRetryable, NeatifyError};
use backon::Retryable;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

const PROFILE_PATH: &str = "rest/v1/staff_profile";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffProfile {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// The `staff_profile` row keyed by the signed-in user's id, plus its avatar.
#[derive(Clone)]
pub struct StaffProfiles {
    client: SupabaseClient,
    bucket: String,
}

impl StaffProfiles {
    pub fn new(client: SupabaseClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Missing rows read as an empty profile.
    pub async fn load(&self, identity: &Identity) -> Result<StaffProfile, NeatifyError> {
        (|| async { self.fetch(identity).await })
            .retry(default_retry_policy())
            .when(|e: &NeatifyError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("profile load retrying after error {}, sleeping {:?}", err, dur);
            })
            .await
    }

    async fn fetch(&self, identity: &Identity) -> Result<StaffProfile, NeatifyError> {
        let request = self
            .client
            .request(Method::GET, PROFILE_PATH, Some(identity.access_token.as_str()))?
            .query(&[
                ("select", "*".to_string()),
                ("id", format!("eq.{}", identity.user_id)),
            ]);
        let rows: Vec<StaffProfile> = self.client.send(request).await?.json().await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    pub async fn update(
        &self,
        identity: &Identity,
        full_name: &str,
        phone: &str,
    ) -> Result<(), NeatifyError> {
        self.patch(identity, json!({ "full_name": full_name, "phone": phone }))
            .await?;
        info!(user_id = %identity.user_id, "profile updated");
        Ok(())
    }

    /// Store a JPEG as `<user id>.jpg`, replacing any previous avatar, and
    /// point the profile at its public URL.
    pub async fn upload_avatar(
        &self,
        identity: &Identity,
        jpeg: Vec<u8>,
    ) -> Result<Url, NeatifyError> {
        let file_name = format!("{}.jpg", identity.user_id);

        let upload = self
            .client
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{}", self.bucket, file_name),
                Some(identity.access_token.as_str()),
            )?
            .header("x-upsert", "true")
            .header(CONTENT_TYPE, "image/jpeg")
            .body(jpeg);
        self.client.send(upload).await?;

        let public_url = self.public_url(&file_name)?;
        self.patch(identity, json!({ "avatar_url": public_url.as_str() }))
            .await?;
        info!(user_id = %identity.user_id, url = %public_url, "avatar uploaded");
        Ok(public_url)
    }

    pub fn public_url(&self, file_name: &str) -> Result<Url, NeatifyError> {
        self.client
            .endpoint(&format!("storage/v1/object/public/{}/{}", self.bucket, file_name))
    }

    async fn patch(&self, identity: &Identity, body: serde_json::Value) -> Result<(), NeatifyError> {
        let request = self
            .client
            .request(Method::PATCH, PROFILE_PATH, Some(identity.access_token.as_str()))?
            .header("Prefer", "return=minimal")
            .query(&[("id", format!("eq.{}", identity.user_id))])
            .json(&body);
        self.client.send(request).await?;
        Ok(())
    }
}
