//! Frame codec for the realtime delivery gateway.
//!
//! The gateway speaks newline-delimited JSON: one `{"event": ..., "data": ...}`
//! object per line. Event names and payload shapes match the storefront
//! backend; unknown events decode to `None` so new backend events never break
//! older clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;
use crate::geo::LocationSample;
use crate::order::{Courier, OrderStatus, StatusEntry};

pub const JOIN_ORDER_ROOM: &str = "join_order_room";
pub const LEAVE_ORDER_ROOM: &str = "leave_order_room";
pub const JOIN_PILOT_ROOM: &str = "join_pilot_room";
pub const LEAVE_PILOT_ROOM: &str = "leave_pilot_room";
pub const PILOT_LOCATION_UPDATE: &str = "pilot_location_update";
pub const PILOT_LOCATION: &str = "pilot_location";
pub const DELIVERY_LOCATION_UPDATE: &str = "delivery_location_update";
pub const ORDER_STATUS_UPDATE: &str = "order_status_update";
pub const PILOT_ASSIGNED: &str = "pilot_assigned";

/// One frame as it travels the wire, before payload typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl RawFrame {
    pub fn decode(line: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn encode(&self) -> Result<String, ChannelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Type the payload by event name. Unknown events yield `Ok(None)`.
    pub fn into_event(self) -> Result<Option<GatewayEvent>, ChannelError> {
        let event = match self.event.as_str() {
            ORDER_STATUS_UPDATE => {
                GatewayEvent::StatusChanged(serde_json::from_value(self.data)?)
            }
            DELIVERY_LOCATION_UPDATE | PILOT_LOCATION_UPDATE | PILOT_LOCATION => {
                GatewayEvent::CourierMoved(serde_json::from_value(self.data)?)
            }
            PILOT_ASSIGNED => {
                GatewayEvent::CourierAssigned(serde_json::from_value(self.data)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// A live courier position as published to a room. Courier-side emissions
/// carry the order and courier identifiers; order-room rebroadcasts may be
/// bare coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierPing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(rename = "pilotId", default, skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl CourierPing {
    pub const fn sample(&self) -> LocationSample {
        LocationSample {
            lat: self.lat,
            lng: self.lng,
            timestamp: self.timestamp,
        }
    }
}

/// Status change pushed to an order room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
}

/// Courier assignment pushed to an order room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourierAssignment {
    pub order_number: String,
    #[serde(rename = "pilot")]
    pub courier: Courier,
}

/// Typed server-to-client event, fanned out to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    StatusChanged(StatusUpdate),
    CourierMoved(CourierPing),
    CourierAssigned(CourierAssignment),
}

/// Client-to-gateway frames.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    JoinOrderRoom(String),
    LeaveOrderRoom(String),
    JoinPilotRoom(String),
    LeavePilotRoom(String),
    CourierPing(CourierPing),
}

impl ClientFrame {
    pub const fn event(&self) -> &'static str {
        match self {
            Self::JoinOrderRoom(_) => JOIN_ORDER_ROOM,
            Self::LeaveOrderRoom(_) => LEAVE_ORDER_ROOM,
            Self::JoinPilotRoom(_) => JOIN_PILOT_ROOM,
            Self::LeavePilotRoom(_) => LEAVE_PILOT_ROOM,
            Self::CourierPing(_) => PILOT_LOCATION_UPDATE,
        }
    }

    /// Encode as one wire line, without the trailing newline.
    pub fn encode(&self) -> Result<String, ChannelError> {
        let data = match self {
            Self::JoinOrderRoom(room)
            | Self::LeaveOrderRoom(room)
            | Self::JoinPilotRoom(room)
            | Self::LeavePilotRoom(room) => Value::String(room.clone()),
            Self::CourierPing(ping) => serde_json::to_value(ping)?,
        };

        RawFrame {
            event: self.event().to_string(),
            data,
        }
        .encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_frame_encodes_room_as_bare_string() {
        let frame = ClientFrame::JoinOrderRoom("ORD-1001".to_string());
        let line = frame.encode().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({ "event": "join_order_room", "data": "ORD-1001" })
        );
    }

    #[test]
    fn test_courier_ping_encodes_backend_field_names() {
        let frame = ClientFrame::CourierPing(CourierPing {
            order_number: Some("ORD-1001".to_string()),
            courier_id: Some("664a0b1c".to_string()),
            lat: 29.295,
            lng: 47.995,
            timestamp: None,
        });

        let value: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(value["event"], "pilot_location_update");
        assert_eq!(value["data"]["orderNumber"], "ORD-1001");
        assert_eq!(value["data"]["pilotId"], "664a0b1c");
        assert_eq!(value["data"]["lat"], 29.295);
    }

    #[test]
    fn test_status_update_decodes() {
        let line = r#"{"event":"order_status_update","data":{"orderNumber":"ORD-1001","status":"packed","statusHistory":[{"status":"pending","timestamp":"2026-02-01T09:00:00Z"}]}}"#;

        let event = RawFrame::decode(line).unwrap().into_event().unwrap();
        match event {
            Some(GatewayEvent::StatusChanged(update)) => {
                assert_eq!(update.order_number, "ORD-1001");
                assert_eq!(update.status, OrderStatus::Packed);
                assert_eq!(update.status_history.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_every_location_event_name_decodes_to_courier_moved() {
        for name in [DELIVERY_LOCATION_UPDATE, PILOT_LOCATION_UPDATE, PILOT_LOCATION] {
            let line = format!(
                r#"{{"event":"{name}","data":{{"lat":29.295,"lng":47.995,"timestamp":"2026-02-01T11:42:00Z"}}}}"#
            );

            let event = RawFrame::decode(&line).unwrap().into_event().unwrap();
            match event {
                Some(GatewayEvent::CourierMoved(ping)) => {
                    assert!((ping.lat - 29.295).abs() < f64::EPSILON);
                    assert!(ping.order_number.is_none());
                    assert!(ping.timestamp.is_some());
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn test_pilot_assigned_decodes_courier() {
        let line = r#"{"event":"pilot_assigned","data":{"orderNumber":"ORD-1001","pilot":{"_id":"664a0b1c","name":"Fahad","phone":"+965 5111 1111"}}}"#;

        let event = RawFrame::decode(line).unwrap().into_event().unwrap();
        match event {
            Some(GatewayEvent::CourierAssigned(assignment)) => {
                assert_eq!(assignment.order_number, "ORD-1001");
                assert_eq!(assignment.courier.name, "Fahad");
                assert_eq!(assignment.courier.id.as_deref(), Some("664a0b1c"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_yields_none() {
        let line = r#"{"event":"join_admin_room","data":{}}"#;
        let event = RawFrame::decode(line).unwrap().into_event().unwrap();
        assert!(event.is_none());
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(RawFrame::decode("not json").is_err());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        // Right event name, wrong payload shape.
        let line = r#"{"event":"order_status_update","data":{"lat":1.0}}"#;
        let frame = RawFrame::decode(line).unwrap();
        assert!(frame.into_event().is_err());
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let frame = RawFrame::decode(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(frame.data, Value::Null);
        assert!(frame.into_event().unwrap().is_none());
    }
}
