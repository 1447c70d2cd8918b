use crate::auth::Identity;
use crate::backend::SupabaseClient;
use crate::backend::client::default_retry_policy;
use crate::error::{IsRetryable, NeatifyError};
use backon::Retryable;
use reqwest::Method;
use reqwest::header::CONTENT_RANGE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const BOOKINGS_PATH: &str = "rest/v1/bookings";

/// Row id of a booking; projects use either serial or uuid keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingId {
    Int(i64),
    Text(String),
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingId::Int(id) => write!(f, "{id}"),
            BookingId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedService {
    #[serde(default)]
    pub title: Option<String>,
    /// Free-form: minutes as a number or a label such as "2 hrs".
    #[serde(default)]
    pub duration: Option<Value>,
}

impl BookedService {
    pub fn duration_label(&self) -> String {
        match &self.duration {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde(default)]
    pub services: Option<Vec<BookedService>>,
    #[serde(default)]
    pub booking_date: Option<String>,
    #[serde(default)]
    pub booking_time: Option<String>,
    #[serde(default)]
    pub assigned_staff_email: Option<String>,
    #[serde(default)]
    pub is_viewed: Option<bool>,
}

impl Booking {
    pub fn services(&self) -> &[BookedService] {
        self.services.as_deref().unwrap_or_default()
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        writeln!(f, "{}", field(&self.customer_name))?;
        writeln!(f, "  Email: {}", field(&self.email))?;
        writeln!(f, "  Phone: {}", field(&self.phone_number))?;
        writeln!(f, "  Address: {}", field(&self.full_address))?;
        writeln!(f, "  Services:")?;
        for service in self.services() {
            writeln!(f, "    • {}", service.title.as_deref().unwrap_or_default())?;
            writeln!(f, "      Date: {}", field(&self.booking_date))?;
            writeln!(f, "      Duration: {}", service.duration_label())?;
        }
        write!(f, "  Time: {}", field(&self.booking_time))
    }
}

/// Google Maps search link for an address; `None` when there is no address.
pub fn maps_search_url(base: &Url, address: &str) -> Option<Url> {
    if address.is_empty() {
        return None;
    }
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("api", "1")
        .append_pair("query", address);
    Some(url)
}

/// Parse the total out of a PostgREST `Content-Range` value (`0-9/42`, `*/0`).
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Bookings assigned to the signed-in staff member.
#[derive(Clone)]
pub struct StaffBookings {
    client: SupabaseClient,
}

impl StaffBookings {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    pub async fn assigned(&self, identity: &Identity) -> Result<Vec<Booking>, NeatifyError> {
        let bookings = (|| async { self.fetch_assigned(identity).await })
            .retry(default_retry_policy())
            .when(|e: &NeatifyError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("bookings fetch retrying after error {}, sleeping {:?}", err, dur);
            })
            .await?;
        debug!(email = %identity.email, count = bookings.len(), "loaded assigned bookings");
        Ok(bookings)
    }

    async fn fetch_assigned(&self, identity: &Identity) -> Result<Vec<Booking>, NeatifyError> {
        let request = self
            .client
            .request(Method::GET, BOOKINGS_PATH, Some(identity.access_token.as_str()))?
            .query(&[
                ("select", "*".to_string()),
                ("assigned_staff_email", format!("eq.{}", identity.email)),
            ]);
        Ok(self.client.send(request).await?.json().await?)
    }

    /// Number of assigned bookings not yet opened by the staff member.
    pub async fn unviewed_count(&self, identity: &Identity) -> Result<u64, NeatifyError> {
        (|| async { self.fetch_unviewed_count(identity).await })
            .retry(default_retry_policy())
            .when(|e: &NeatifyError| e.is_retryable())
            .notify(|err, dur: Duration| {
                warn!("unviewed count retrying after error {}, sleeping {:?}", err, dur);
            })
            .await
    }

    async fn fetch_unviewed_count(&self, identity: &Identity) -> Result<u64, NeatifyError> {
        let request = self
            .client
            .request(Method::HEAD, BOOKINGS_PATH, Some(identity.access_token.as_str()))?
            .header("Prefer", "count=exact")
            .query(&[
                ("select", "*".to_string()),
                ("assigned_staff_email", format!("eq.{}", identity.email)),
                ("is_viewed", "eq.false".to_string()),
            ]);
        let resp = self.client.send(request).await?;
        resp.headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or(NeatifyError::MissingCount)
    }

    pub async fn mark_viewed(
        &self,
        identity: &Identity,
        booking_id: &BookingId,
    ) -> Result<(), NeatifyError> {
        let request = self
            .client
            .request(Method::PATCH, BOOKINGS_PATH, Some(identity.access_token.as_str()))?
            .header("Prefer", "return=minimal")
            .query(&[
                ("id", format!("eq.{booking_id}")),
                ("assigned_staff_email", format!("eq.{}", identity.email)),
            ])
            .json(&json!({ "is_viewed": true }));
        self.client.send(request).await?;
        debug!(booking_id = %booking_id, "booking marked as viewed");
        Ok(())
    }
}
