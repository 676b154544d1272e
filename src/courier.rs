//! Courier-side publisher that replays a recorded route as live pings.
//!
//! Drivers run the same binary against the same gateway. `RoutePlayer` walks
//! an ordered list of location samples at a fixed interval, emitting one
//! `pilot_location_update` frame per point, until the route ends or shutdown
//! is signalled.

use std::path::Path;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Interval, interval};
use tracing::{debug, info};

use crate::channel::{ClientFrame, CourierPing, DynChannel, Room};
use crate::error::{ChannelError, RouteError};
use crate::geo::LocationSample;

#[derive(Debug, Clone)]
pub struct RoutePlayerConfig {
    pub order_number: String,
    pub courier_id: String,
    pub ping_interval: Duration,
}

pub struct RoutePlayer {
    config: RoutePlayerConfig,
    channel: DynChannel,
    route: Vec<LocationSample>,
    interval: Interval,
    shutdown_rx: watch::Receiver<bool>,
}

impl RoutePlayer {
    pub fn new(
        config: RoutePlayerConfig,
        channel: DynChannel,
        route: Vec<LocationSample>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        // Tokio intervals reject a zero period.
        let interval = interval(config.ping_interval.max(Duration::from_millis(1)));

        Self {
            config,
            channel,
            route,
            interval,
            shutdown_rx,
        }
    }

    /// Join the courier's room and replay the route to the end. Returns the
    /// number of pings published, which is short of the route length when
    /// shutdown interrupts the replay.
    pub async fn run(mut self) -> Result<usize, ChannelError> {
        if *self.shutdown_rx.borrow() {
            return Ok(0);
        }

        info!(
            "Replaying {} route points for {} every {:?}",
            self.route.len(),
            self.config.order_number,
            self.config.ping_interval
        );

        self.channel
            .join(Room::Courier(self.config.courier_id.clone()))
            .await?;

        let route = std::mem::take(&mut self.route);
        let mut published = 0;

        for (index, sample) in route.into_iter().enumerate() {
            tokio::select! {
                _ = self.interval.tick() => {}
                _ = self.shutdown_rx.changed() => {
                    info!("Route replay interrupted after {published} pings");
                    return Ok(published);
                }
            }

            debug!(
                "Publishing route point {index}: ({}, {})",
                sample.lat, sample.lng
            );
            self.channel
                .emit(ClientFrame::CourierPing(CourierPing {
                    order_number: Some(self.config.order_number.clone()),
                    courier_id: Some(self.config.courier_id.clone()),
                    lat: sample.lat,
                    lng: sample.lng,
                    timestamp: sample.timestamp,
                }))
                .await?;
            published += 1;
        }

        info!(
            "Route replay complete for {} ({published} pings)",
            self.config.order_number
        );
        Ok(published)
    }
}

/// Read an ordered route from a JSON file of `{lat, lng}` samples.
pub fn load_route(path: &Path) -> Result<Vec<LocationSample>, RouteError> {
    let text = std::fs::read_to_string(path)?;
    let route: Vec<LocationSample> = serde_json::from_str(&text)?;
    if route.is_empty() {
        return Err(RouteError::Empty);
    }
    Ok(route)
}
