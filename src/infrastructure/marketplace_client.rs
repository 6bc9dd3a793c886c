use crate::domain::models::{BlockedInterval, BookedInterval};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Wire shape of a confirmed reservation inside the property payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct BookedRangeDto {
    #[serde(rename = "checkIn")]
    pub check_in: String,
    #[serde(rename = "checkOut")]
    pub check_out: String,
}

/// Wire shape of a host-created block inside the property payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct BlockedDateDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize, PartialEq, Eq)]
pub struct PropertyCalendarResponse {
    #[serde(rename = "bookedDates", default)]
    pub booked_dates: Vec<BookedRangeDto>,
    #[serde(rename = "blockedDates", default)]
    pub blocked_dates: Vec<BlockedDateDto>,
}

#[derive(Debug, Clone, serde::Serialize, PartialEq, Eq)]
pub struct CreateBlockRequest {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
}

#[derive(Debug, serde::Deserialize)]
struct StatusResponse {
    success: bool,
    message: Option<String>,
}

impl BookedRangeDto {
    pub fn to_interval(&self) -> Result<BookedInterval, InfraError> {
        let interval = BookedInterval {
            check_in: parse_wire_day(&self.check_in, "checkIn")?,
            check_out: parse_wire_day(&self.check_out, "checkOut")?,
        };
        interval.validate().map_err(InfraError::Api)?;
        Ok(interval)
    }
}

impl BlockedDateDto {
    pub fn to_interval(&self) -> Result<BlockedInterval, InfraError> {
        let interval = BlockedInterval {
            id: self.id.trim().to_string(),
            start_date: parse_wire_day(&self.start_date, "startDate")?,
            end_date: parse_wire_day(&self.end_date, "endDate")?,
        };
        interval.validate().map_err(InfraError::Api)?;
        Ok(interval)
    }
}

fn parse_wire_day(
    value: &str,
    field_name: &str,
) -> Result<crate::domain::models::CalendarDay, InfraError> {
    crate::domain::models::CalendarDay::parse(value)
        .map_err(|error| InfraError::Api(format!("invalid {field_name} in payload: {error}")))
}

#[async_trait]
pub trait PropertyApiClient: Send + Sync {
    async fn fetch_property_calendar(
        &self,
        access_token: &str,
        property_id: &str,
    ) -> Result<PropertyCalendarResponse, InfraError>;

    async fn create_block(
        &self,
        access_token: &str,
        property_id: &str,
        request: CreateBlockRequest,
    ) -> Result<(), InfraError>;

    async fn delete_block(
        &self,
        access_token: &str,
        property_id: &str,
        block_id: &str,
    ) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestPropertyApiClient {
    client: Client,
    base_url: Url,
}

impl ReqwestPropertyApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Api(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn api_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("marketplace api error: http {}", status.as_u16())
        } else {
            format!(
                "marketplace api error: http {}; body={body}",
                status.as_u16()
            )
        };
        InfraError::Api(message)
    }

    fn property_endpoint(&self, property_id: &str, tail: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| InfraError::Api("api base URL cannot be a base".to_string()))?;
            segments.push("properties");
            segments.push(property_id);
            for segment in tail {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    /// Every non-2xx response and every `success: false` body ends up as an
    /// `InfraError::Api` carrying the server's own message verbatim.
    fn interpret_status_body(status: reqwest::StatusCode, body: &str) -> Result<(), InfraError> {
        if !status.is_success() {
            return Err(Self::api_http_error(status, body));
        }
        let parsed: StatusResponse = serde_json::from_str(body).map_err(|error| {
            InfraError::Api(format!("invalid status payload: {error}; body={body}"))
        })?;
        if !parsed.success {
            let message = parsed
                .message
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| "server reported failure".to_string());
            return Err(InfraError::Api(message));
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyApiClient for ReqwestPropertyApiClient {
    async fn fetch_property_calendar(
        &self,
        access_token: &str,
        property_id: &str,
    ) -> Result<PropertyCalendarResponse, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(property_id, "property id")?;

        let endpoint = self.property_endpoint(property_id, &["calendar"])?;
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| {
                InfraError::Api(format!("network error while fetching property calendar: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Api(format!("failed reading property calendar response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::api_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|error| {
            InfraError::Api(format!("invalid property calendar payload: {error}; body={body}"))
        })
    }

    async fn create_block(
        &self,
        access_token: &str,
        property_id: &str,
        request: CreateBlockRequest,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(property_id, "property id")?;

        let endpoint = self.property_endpoint(property_id, &["block-dates"])?;
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                InfraError::Api(format!("network error while blocking dates: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Api(format!("failed reading block-dates response: {error}"))
        })?;

        Self::interpret_status_body(status, &body)
    }

    async fn delete_block(
        &self,
        access_token: &str,
        property_id: &str,
        block_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(property_id, "property id")?;
        Self::ensure_non_empty(block_id, "block id")?;

        let endpoint = self.property_endpoint(property_id, &["blocked-date", block_id])?;
        let response = self
            .client
            .delete(endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| {
                InfraError::Api(format!("network error while removing block: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Api(format!("failed reading blocked-date delete response: {error}"))
        })?;

        Self::interpret_status_body(status, &body)
    }
}
