//! Live tracking session for one order.
//!
//! `TrackingSession` owns everything the tracking panel shows: the looked-up
//! order, the projected timeline, and the map state. It is the only mutator
//! of that state. Gateway events are folded in one at a time with [`apply`],
//! which makes redraws idempotent: replaying a stale or duplicate event
//! converges to the same rendered panel.
//!
//! [`apply`]: TrackingSession::apply

pub mod view;

use std::time::Instant;

use tracing::{debug, info};

use crate::api::ApiClient;
use crate::channel::{DynChannel, GatewayEvent, Room};
use crate::error::{ChannelError, TrackError};
use crate::i18n::Locale;
use crate::map::MapView;
use crate::order::{Order, Timeline, build_timeline};

pub use view::{TrackingView, render, render_not_found};

/// One customer's live view of one order.
#[derive(Debug)]
pub struct TrackingSession {
    order_number: String,
    order: Order,
    timeline: Timeline,
    map: MapView,
    channel: DynChannel,
    rooms: Vec<Room>,
    active: bool,
    locale: Locale,
}

impl TrackingSession {
    /// Look the order up and start tracking it.
    pub async fn start(
        api: &ApiClient,
        channel: DynChannel,
        order_number: &str,
        locale: Locale,
    ) -> Result<Self, TrackError> {
        let order = api.track_order(order_number).await?;
        Self::from_order(channel, order_number, order, locale, Instant::now()).await
    }

    /// Build a session from an already-fetched order and announce interest in
    /// its gateway rooms: always the order room, plus the courier's room when
    /// a courier with an id is already assigned.
    pub async fn from_order(
        channel: DynChannel,
        order_number: &str,
        order: Order,
        locale: Locale,
        now: Instant,
    ) -> Result<Self, TrackError> {
        let timeline = build_timeline(&order.status, &order.status_history);
        let map = MapView::for_order(
            order.destination(),
            order.last_known_location().as_ref(),
            now,
        );

        let mut rooms = vec![Room::Order(order_number.to_string())];
        if let Some(courier_id) = order.courier.as_ref().and_then(|courier| courier.id.clone()) {
            rooms.push(Room::Courier(courier_id));
        }
        for room in &rooms {
            channel.join(room.clone()).await?;
        }
        info!(
            "Tracking {order_number} ({}) in {} gateway rooms",
            order.status,
            rooms.len()
        );

        Ok(Self {
            order_number: order_number.to_string(),
            order,
            timeline,
            map,
            channel,
            rooms,
            active: true,
            locale,
        })
    }

    /// Fold one gateway event into the session.
    ///
    /// Status and assignment events carry an order number and are dropped
    /// when it differs from ours. Location events are trusted to be
    /// room-scoped, so only an explicit mismatching order number drops them.
    /// Events arriving after [`stop`](Self::stop) change nothing.
    pub fn apply(&mut self, event: &GatewayEvent, now: Instant) {
        if !self.active {
            return;
        }

        match event {
            GatewayEvent::StatusChanged(update) => {
                if update.order_number != self.order_number {
                    return;
                }
                self.order.status = update.status.clone();
                if !update.status_history.is_empty() {
                    self.order.status_history = update.status_history.clone();
                }
                self.timeline = build_timeline(&self.order.status, &self.order.status_history);
                info!("Order {} moved to {}", self.order_number, self.order.status);
            }
            GatewayEvent::CourierMoved(ping) => {
                if let Some(number) = &ping.order_number {
                    if number != &self.order_number {
                        return;
                    }
                }
                let sample = ping.sample();
                self.map.update_courier_position(&sample, now);
                self.order.delivery_location = Some(sample);
                debug!(
                    "Courier for {} now at ({}, {})",
                    self.order_number, ping.lat, ping.lng
                );
            }
            GatewayEvent::CourierAssigned(assignment) => {
                if assignment.order_number != self.order_number {
                    return;
                }
                info!(
                    "Courier {} assigned to {}",
                    assignment.courier.name, self.order_number
                );
                self.order.courier = Some(assignment.courier.clone());
            }
        }
    }

    /// Leave the gateway rooms and stop folding events. No event applied
    /// after this returns changes the session.
    pub async fn stop(&mut self) -> Result<(), ChannelError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        for room in self.rooms.drain(..) {
            self.channel.leave(room).await?;
        }
        info!("Stopped tracking {}", self.order_number);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn map_view(&self) -> &MapView {
        &self.map
    }

    /// Snapshot everything the renderer needs at `now`.
    pub fn view(&self, now: Instant) -> TrackingView {
        TrackingView {
            order_number: self.order_number.clone(),
            locale: self.locale,
            status: self.order.status.clone(),
            timeline: self.timeline.clone(),
            courier: self.order.courier.clone(),
            courier_position: self.map.courier_position(now),
            destination: self.map.destination(),
            estimate: self.map.route_estimate(),
            trail_len: self.map.trail_len(),
            viewport: *self.map.viewport(),
            base_layer: self.map.base_layer(),
            items: self.order.items.clone(),
            total: self.order.total(),
            last_update: self
                .order
                .delivery_location
                .as_ref()
                .and_then(|sample| sample.timestamp),
            active: self.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::channel::{CourierAssignment, CourierPing, LogChannel, StatusUpdate};
    use crate::order::{OrderStatus, StageState};
    use crate::test_utils::{OrderBuilder, tracked_order};

    async fn session() -> TrackingSession {
        TrackingSession::from_order(
            Arc::new(LogChannel::new()),
            "ORD-1001",
            tracked_order(),
            Locale::En,
            Instant::now(),
        )
        .await
        .unwrap()
    }

    fn ping(order_number: Option<&str>, lat: f64, lng: f64) -> GatewayEvent {
        GatewayEvent::CourierMoved(CourierPing {
            order_number: order_number.map(str::to_string),
            courier_id: Some("664a0b1c2d3e4f5a6b7c8d9e".to_string()),
            lat,
            lng,
            timestamp: None,
        })
    }

    #[tokio::test]
    async fn test_start_joins_order_and_courier_rooms() {
        let session = session().await;

        assert_eq!(session.rooms.len(), 2);
        assert!(
            session
                .rooms
                .contains(&Room::Order("ORD-1001".to_string()))
        );
        assert!(
            session
                .rooms
                .contains(&Room::Courier("664a0b1c2d3e4f5a6b7c8d9e".to_string()))
        );
    }

    #[tokio::test]
    async fn test_start_without_courier_joins_only_order_room() {
        let order = OrderBuilder::new().with_courier(None).build();
        let session = TrackingSession::from_order(
            Arc::new(LogChannel::new()),
            "ORD-1001",
            order,
            Locale::En,
            Instant::now(),
        )
        .await
        .unwrap();

        assert_eq!(session.rooms, vec![Room::Order("ORD-1001".to_string())]);
    }

    #[tokio::test]
    async fn test_order_awaiting_courier_has_no_map_fix() {
        let order = OrderBuilder::new()
            .with_order_number("ORD-3003")
            .with_status(OrderStatus::Confirmed)
            .with_history(vec![])
            .with_courier(None)
            .with_delivery_location(None)
            .build();
        let session = TrackingSession::from_order(
            Arc::new(LogChannel::new()),
            "ORD-3003",
            order,
            Locale::En,
            Instant::now(),
        )
        .await
        .unwrap();

        assert_eq!(session.rooms, vec![Room::Order("ORD-3003".to_string())]);

        let view = session.view(Instant::now());
        assert!(view.courier_position.is_none());
        assert!(view.estimate.is_none());
        assert_eq!(view.trail_len, 0);
        assert_eq!(view.timeline.completed_count(), 1);
        assert!(
            view.timeline
                .stages
                .iter()
                .all(|stage| stage.timestamp.is_none())
        );
    }

    #[tokio::test]
    async fn test_status_event_rebuilds_timeline() {
        let mut session = session().await;
        assert_eq!(session.timeline.completed_count(), 5);

        session.apply(
            &GatewayEvent::StatusChanged(StatusUpdate {
                order_number: "ORD-1001".to_string(),
                status: OrderStatus::Delivered,
                status_history: vec![],
            }),
            Instant::now(),
        );

        assert_eq!(session.order.status, OrderStatus::Delivered);
        assert_eq!(session.timeline.completed_count(), 6);
        assert_eq!(
            session.timeline.active_stage().map(|stage| &stage.status),
            Some(&OrderStatus::Delivered)
        );
        // History from the lookup is kept when the event carries none.
        assert_eq!(session.order.status_history.len(), 6);
    }

    #[tokio::test]
    async fn test_status_event_for_other_order_is_ignored() {
        let mut session = session().await;

        session.apply(
            &GatewayEvent::StatusChanged(StatusUpdate {
                order_number: "ORD-2002".to_string(),
                status: OrderStatus::Cancelled,
                status_history: vec![],
            }),
            Instant::now(),
        );

        assert_eq!(session.order.status, OrderStatus::OutForDelivery);
    }

    #[tokio::test]
    async fn test_location_event_moves_marker_and_estimate() {
        let mut session = session().await;
        let now = Instant::now();

        session.apply(&ping(None, 29.299, 47.999), now);

        let target = session.map.courier_target().unwrap();
        assert!((target.lat - 29.299).abs() < f64::EPSILON);

        let estimate = session.map.route_estimate().unwrap();
        assert!(estimate.distance_km < 0.2);
        assert_eq!(estimate.eta_minutes, 1);
        assert_eq!(session.map.trail_len(), 2);
    }

    #[tokio::test]
    async fn test_location_event_for_other_order_is_ignored() {
        let mut session = session().await;

        session.apply(&ping(Some("ORD-2002"), 10.0, 10.0), Instant::now());

        let target = session.map.courier_target().unwrap();
        assert!((target.lat - 29.295).abs() < f64::EPSILON);
        assert_eq!(session.map.trail_len(), 1);
    }

    #[tokio::test]
    async fn test_ungeocoded_address_tracks_without_estimate() {
        let order = OrderBuilder::new().with_destination(None).build();
        let mut session = TrackingSession::from_order(
            Arc::new(LogChannel::new()),
            "ORD-1001",
            order,
            Locale::En,
            Instant::now(),
        )
        .await
        .unwrap();

        session.apply(&ping(None, 29.299, 47.999), Instant::now());

        assert!(session.map.courier_target().is_some());
        assert!(session.map.route_estimate().is_none());
    }

    #[tokio::test]
    async fn test_assignment_updates_courier_info() {
        let order = OrderBuilder::new().with_courier(None).build();
        let mut session = TrackingSession::from_order(
            Arc::new(LogChannel::new()),
            "ORD-1001",
            order,
            Locale::En,
            Instant::now(),
        )
        .await
        .unwrap();

        session.apply(
            &GatewayEvent::CourierAssigned(CourierAssignment {
                order_number: "ORD-1001".to_string(),
                courier: crate::order::Courier {
                    id: Some("999".to_string()),
                    name: "Noura".to_string(),
                    phone: None,
                    location: None,
                },
            }),
            Instant::now(),
        );

        assert_eq!(session.order.courier.as_ref().unwrap().name, "Noura");
    }

    #[tokio::test]
    async fn test_stop_leaves_rooms_and_freezes_state() {
        let mut session = session().await;
        session.stop().await.unwrap();

        assert!(!session.is_active());
        assert!(session.rooms.is_empty());

        let before = session.map.trail_len();
        session.apply(&ping(None, 29.3, 48.0), Instant::now());
        session.apply(
            &GatewayEvent::StatusChanged(StatusUpdate {
                order_number: "ORD-1001".to_string(),
                status: OrderStatus::Delivered,
                status_history: vec![],
            }),
            Instant::now(),
        );

        assert_eq!(session.map.trail_len(), before);
        assert_eq!(session.order.status, OrderStatus::OutForDelivery);

        // Stopping twice is fine.
        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_events_converge() {
        let mut session = session().await;
        let now = Instant::now();
        let update = GatewayEvent::StatusChanged(StatusUpdate {
            order_number: "ORD-1001".to_string(),
            status: OrderStatus::Delivered,
            status_history: vec![],
        });

        session.apply(&update, now);
        let first = session.timeline.clone();
        session.apply(&update, now);

        assert_eq!(session.timeline, first);
    }

    #[tokio::test]
    async fn test_view_snapshot_carries_estimate_and_totals() {
        let session = session().await;
        let view = session.view(Instant::now());

        let estimate = view.estimate.unwrap();
        assert!((estimate.distance_km - 0.7377).abs() < 0.001);
        assert_eq!(estimate.eta_minutes, 2);
        assert_eq!(view.total, rust_decimal_macros::dec!(65.00));
        assert_eq!(view.base_layer.name, "Satellite");
        assert_eq!(
            view.timeline
                .stages
                .iter()
                .filter(|stage| stage.state == StageState::Completed)
                .count(),
            5
        );
    }
}
