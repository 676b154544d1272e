use serde_json::{Value, json};

use crate::geo::{Coordinates, LocationSample};
use crate::order::{Courier, Order, OrderStatus, StatusEntry};

/// Returns the public tracking payload the backend serves for the order used
/// across the tracking tests: out for delivery, courier assigned, last fix a
/// short hop from the destination. The exact values are not important, only
/// that the structure is valid and deterministic.
pub fn tracking_payload_json() -> Value {
    json!({
        "orderNumber": "ORD-1001",
        "status": "out_for_delivery",
        "statusHistory": [
            { "status": "pending", "timestamp": "2026-02-01T09:00:00Z" },
            { "status": "confirmed", "timestamp": "2026-02-01T09:05:00Z", "note": "Payment received" },
            { "status": "packed", "timestamp": "2026-02-01T10:10:00Z" },
            { "status": "processing", "timestamp": "2026-02-01T10:40:00Z" },
            { "status": "handed_over", "timestamp": "2026-02-01T11:20:00Z" },
            { "status": "out_for_delivery", "timestamp": "2026-02-01T11:30:00Z" }
        ],
        "items": [
            { "name": "Murano glass vase", "price": 42.5, "quantity": 1 },
            { "name": "Brass candle holder", "price": 11.25, "quantity": 2 }
        ],
        "shippingAddress": {
            "street": "Block 4, Street 12",
            "city": "Kuwait City",
            "phone": "+965 5000 0000",
            "coordinates": { "lat": 29.30, "lng": 48.00 }
        },
        "deliveryPilot": {
            "_id": "664a0b1c2d3e4f5a6b7c8d9e",
            "name": "Fahad",
            "phone": "+965 5111 1111",
            "location": { "lat": 29.28, "lng": 47.97 }
        },
        "deliveryLocation": { "lat": 29.295, "lng": 47.995, "timestamp": "2026-02-01T11:42:00Z" },
        "createdAt": "2026-02-01T08:58:00Z"
    })
}

/// Returns a full order document as served by the authenticated endpoints,
/// which use `orderStatus` instead of the tracking endpoint's `status`.
pub fn order_json(order_number: &str) -> Value {
    let mut payload = tracking_payload_json();
    let object = payload.as_object_mut().unwrap();
    let status = object.remove("status").unwrap();
    object.insert("orderStatus".to_string(), status);
    object.insert("_id".to_string(), json!("665f1a2b3c4d5e6f70819202"));
    object.insert("orderNumber".to_string(), json!(order_number));
    payload
}

/// The tracking payload parsed into an [`Order`].
pub fn tracked_order() -> Order {
    serde_json::from_value(tracking_payload_json()).unwrap()
}

/// Builder for creating Order test instances with sensible defaults.
/// Reduces duplication in test data setup.
pub struct OrderBuilder {
    order: Order,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBuilder {
    pub fn new() -> Self {
        Self {
            order: tracked_order(),
        }
    }

    #[must_use]
    pub fn with_order_number(mut self, order_number: impl Into<String>) -> Self {
        self.order.order_number = order_number.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.order.status = status;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<StatusEntry>) -> Self {
        self.order.status_history = history;
        self
    }

    #[must_use]
    pub fn with_courier(mut self, courier: Option<Courier>) -> Self {
        self.order.courier = courier;
        self
    }

    #[must_use]
    pub fn with_delivery_location(mut self, location: Option<LocationSample>) -> Self {
        self.order.delivery_location = location;
        self
    }

    #[must_use]
    pub fn with_destination(mut self, coordinates: Option<Coordinates>) -> Self {
        if let Some(address) = self.order.shipping_address.as_mut() {
            address.coordinates = coordinates;
        }
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}
