//! Domain-specific error types following clean error handling architecture.
//! Separates storefront API, gateway transport, and route replay failures.

/// Storefront REST API interaction errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("No order found with number: {order_number}")]
    NotFound { order_number: String },
    #[error("Backend rejected request with status {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("Backend response missing data payload")]
    MissingData,
    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Delivery gateway transport and framing errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Gateway connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid gateway frame: {0}")]
    Frame(#[from] serde_json::Error),
    #[error("Gateway connection task is gone")]
    Closed,
}

/// Courier route file loading errors.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Failed to read route file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse route file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Route file contains no points")]
    Empty,
}

/// Unified error type for order tracking with clear domain boundaries.
/// Provides error mapping between layers while maintaining separation of concerns.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("Gateway error: {0}")]
    Channel(#[from] ChannelError),
    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

impl From<reqwest::Error> for TrackError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api(ApiError::Http(err))
    }
}

impl From<url::ParseError> for TrackError {
    fn from(err: url::ParseError) -> Self {
        Self::Api(ApiError::InvalidUrl(err))
    }
}
