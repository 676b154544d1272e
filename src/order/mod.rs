pub(crate) mod timeline;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geo::{Coordinates, LocationSample};

pub use timeline::{StageState, Timeline, TimelineStage, build_timeline};

/// Order status as used by the storefront backend.
///
/// The ordered statuses form the fulfilment pipeline; `Cancelled` sits outside
/// it. `Other` absorbs any wire value this client does not know so a backend
/// addition never breaks deserialization. Unknown statuses are displayed
/// verbatim and highlight nothing on the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Packed,
    Processing,
    HandedOver,
    OutForDelivery,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// The ranked fulfilment stages in display order.
    pub const STAGES: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Packed,
        Self::Processing,
        Self::HandedOver,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Packed => "packed",
            Self::Processing => "processing",
            Self::HandedOver => "handed_over",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other(raw) => raw,
        }
    }

    /// Position of this status in the fulfilment pipeline, starting at 1.
    /// `Cancelled` and unrecognized statuses have no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(1),
            Self::Confirmed => Some(2),
            Self::Packed => Some(3),
            Self::Processing => Some(4),
            Self::HandedOver => Some(5),
            Self::OutForDelivery => Some(6),
            Self::Delivered => Some(7),
            Self::Cancelled | Self::Other(_) => None,
        }
    }

    /// Translation catalog key for the display name, when one exists.
    pub fn translation_key(&self) -> Option<&'static str> {
        match self {
            Self::Pending => Some("status_placed"),
            Self::Confirmed => Some("status_confirmed"),
            Self::Packed => Some("status_packed"),
            Self::Processing => Some("status_processing"),
            Self::HandedOver => Some("status_handed_over"),
            Self::OutForDelivery => Some("status_out_for_delivery"),
            Self::Delivered => Some("status_delivered"),
            Self::Cancelled => Some("status_cancelled"),
            Self::Other(_) => None,
        }
    }

    /// Whether the order has reached a state that will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether a courier is expected to be moving for this status.
    pub fn is_en_route(&self) -> bool {
        matches!(self, Self::HandedOver | Self::OutForDelivery)
    }
}

impl From<&str> for OrderStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "confirmed" => Self::Confirmed,
            "packed" => Self::Packed,
            "processing" => Self::Processing,
            "handed_over" => Self::HandedOver,
            "out_for_delivery" => Self::OutForDelivery,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(raw))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// One entry of an order's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: OrderStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A purchased line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    /// Unit price in KWD.
    pub price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Geocoded drop-off point; absent when the address was never geocoded.
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// The courier assigned to deliver an order. The backend calls this role
/// "pilot" on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<LocationSample>,
}

/// A customer order as returned by the storefront API.
///
/// The public tracking endpoint returns a trimmed projection of the same
/// document (`status` instead of `orderStatus`, identifiers omitted); the
/// aliases below accept both shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub order_number: String,
    #[serde(rename = "orderStatus", alias = "status")]
    pub status: OrderStatus,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(rename = "deliveryPilot", default)]
    pub courier: Option<Courier>,
    /// Last courier position persisted by the backend, if any.
    #[serde(default)]
    pub delivery_location: Option<LocationSample>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Order {
    /// Sum of all line totals in KWD.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// The drop-off point, when the shipping address was geocoded.
    pub fn destination(&self) -> Option<Coordinates> {
        self.shipping_address
            .as_ref()
            .and_then(|address| address.coordinates)
    }

    /// Best known courier position: the persisted delivery location wins over
    /// the courier profile's own last location.
    pub fn last_known_location(&self) -> Option<LocationSample> {
        self.delivery_location.clone().or_else(|| {
            self.courier
                .as_ref()
                .and_then(|courier| courier.location.clone())
        })
    }
}

/// Format a KWD amount the way the storefront prints money: three decimal
/// places, currency code trailing.
pub fn format_kwd(amount: Decimal) -> String {
    format!("{amount:.3} KWD")
}
