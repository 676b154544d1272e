//! Typed client for the storefront REST API.
//!
//! Every backend response is wrapped in a `{ success, data, message }`
//! envelope. The client unwraps it, mapping backend rejections and missing
//! payloads onto [`ApiError`] variants so callers never see the envelope.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::error;
use url::Url;

use crate::error::ApiError;
use crate::order::{Order, OrderStatus};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

/// Client for the storefront backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: Url, auth_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            auth_token,
        }
    }

    /// Fetch the public tracking payload for an order number. No
    /// authentication required, and a 404 maps to [`ApiError::NotFound`].
    pub async fn track_order(&self, order_number: &str) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!(
            "/api/delivery/track/{}",
            urlencoding::encode(order_number)
        ))?;
        let response = self.http.get(url).headers(self.headers()?).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound {
                order_number: order_number.to_string(),
            });
        }
        Self::parse_payload(response).await
    }

    /// Fetch one of the customer's own orders by id.
    pub async fn fetch_order(&self, id: &str) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!("/api/orders/{}", urlencoding::encode(id)))?;
        let response = self.http.get(url).headers(self.headers()?).send().await?;
        Self::parse_payload(response).await
    }

    /// List the customer's orders, newest first.
    pub async fn my_orders(&self, page: u32, limit: u32) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint("/api/orders")?;
        let response = self
            .http
            .get(url)
            .query(&[("page", page), ("limit", limit)])
            .headers(self.headers()?)
            .send()
            .await?;
        Self::parse_payload(response).await
    }

    /// List orders currently assigned to the authenticated courier.
    pub async fn assigned_orders(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint("/api/driver/orders")?;
        let response = self.http.get(url).headers(self.headers()?).send().await?;
        Self::parse_payload(response).await
    }

    /// Move an assigned order to a new status on behalf of the courier.
    pub async fn update_order_status(
        &self,
        id: &str,
        status: &OrderStatus,
    ) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!(
            "/api/driver/orders/{}/status",
            urlencoding::encode(id)
        ))?;
        let response = self
            .http
            .put(url)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await?;
        Self::parse_payload(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers: HeaderMap = [(ACCEPT, HeaderValue::from_static("application/json"))]
            .into_iter()
            .collect();
        if let Some(token) = &self.auth_token {
            headers.insert(AUTHORIZATION, format!("Bearer {token}").parse()?);
        }
        Ok(headers)
    }

    async fn parse_payload<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: backend_message(&text),
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse API response: {e}; body: {text}");
            e
        })?;
        if !envelope.success {
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "request rejected".to_string()),
            });
        }
        envelope.data.ok_or(ApiError::MissingData)
    }
}

/// Best-effort extraction of the backend's error message from a failure body.
fn backend_message(body: &str) -> String {
    serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| body.trim().to_string())
}
