//! Headless slippy-map model for the live tracking view.
//!
//! Owns the viewport, base layers, destination and courier markers, and the
//! courier's breadcrumb trail. Everything is plain state sampled at render
//! time; there is no map widget underneath and no readiness to poll.

mod animation;

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::time::Instant;

use crate::geo::{self, Coordinates, LocationSample};
use animation::MarkerAnimation;

/// Fallback map center when an order has no usable coordinates (Kuwait City).
pub const DEFAULT_CENTER: Coordinates = Coordinates {
    lat: 29.3759,
    lng: 47.9774,
};

const DEFAULT_ZOOM: u8 = 12;
const DESTINATION_ZOOM: u8 = 14;
const LIVE_LOCATION_ZOOM: u8 = 15;

/// Upper zoom bound when fitting both markers into the viewport.
const MAX_FIT_ZOOM: u8 = 16;
/// Pixel padding kept around fitted markers on every side.
const FIT_PADDING_PX: u32 = 50;
/// Breadcrumb samples kept for the trail polyline; oldest dropped first.
const TRAIL_CAP: usize = 50;

const TILE_SIZE_PX: f64 = 256.0;
const DEFAULT_VIEWPORT_PX: (u32, u32) = (800, 600);

/// A selectable base tile layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLayer {
    pub name: &'static str,
    pub url_template: &'static str,
    pub subdomains: &'static [&'static str],
    pub attribution: &'static str,
    pub max_zoom: u8,
}

/// Base layers offered by the tracking view, hybrid imagery first.
pub const BASE_LAYERS: [TileLayer; 3] = [
    TileLayer {
        name: "Satellite",
        url_template: "http://{s}.google.com/vt/lyrs=s,h&x={x}&y={y}&z={z}",
        subdomains: &["mt0", "mt1", "mt2", "mt3"],
        attribution: "© Google Maps",
        max_zoom: 20,
    },
    TileLayer {
        name: "Streets (Esri)",
        url_template: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Street_Map/MapServer/tile/{z}/{y}/{x}",
        subdomains: &[],
        attribution: "© Esri",
        max_zoom: 18,
    },
    TileLayer {
        name: "Streets (OSM)",
        url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
        subdomains: &["a", "b", "c"],
        attribution: "© OpenStreetMap",
        max_zoom: 18,
    },
];

/// Visible map window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coordinates,
    pub zoom: u8,
    pub width_px: u32,
    pub height_px: u32,
}

/// Straight-line distance to the destination and the naive arrival estimate
/// derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub eta_minutes: u64,
}

#[derive(Debug, Clone)]
struct CourierMarker {
    target: Coordinates,
    animation: Option<MarkerAnimation>,
}

impl CourierMarker {
    fn position_at(&self, now: Instant) -> Coordinates {
        self.animation
            .as_ref()
            .filter(|animation| !animation.is_complete(now))
            .map_or(self.target, |animation| animation.position_at(now))
    }
}

/// Map state for one tracked order.
#[derive(Debug, Clone)]
pub struct MapView {
    viewport: Viewport,
    base_layer: usize,
    destination: Option<Coordinates>,
    courier: Option<CourierMarker>,
    trail: VecDeque<LocationSample>,
}

impl MapView {
    /// Build the initial view for a freshly looked-up order.
    ///
    /// Centering precedence follows the storefront: city default, then the
    /// destination, then the last known courier position. When a seed position
    /// exists the markers are placed and the viewport fitted once.
    pub fn for_order(
        destination: Option<Coordinates>,
        last_location: Option<&LocationSample>,
        now: Instant,
    ) -> Self {
        let mut center = DEFAULT_CENTER;
        let mut zoom = DEFAULT_ZOOM;

        if let Some(dest) = destination {
            center = dest;
            zoom = DESTINATION_ZOOM;
        }
        if let Some(sample) = last_location {
            center = sample.coordinates();
            zoom = LIVE_LOCATION_ZOOM;
        }

        let mut view = Self {
            viewport: Viewport {
                center,
                zoom,
                width_px: DEFAULT_VIEWPORT_PX.0,
                height_px: DEFAULT_VIEWPORT_PX.1,
            },
            base_layer: 0,
            destination,
            courier: None,
            trail: VecDeque::new(),
        };

        if let Some(sample) = last_location {
            view.seed_courier_position(sample, now);
        }
        view.fit_to_markers();

        view
    }

    /// Place or replace the destination marker.
    pub fn set_destination(&mut self, destination: Option<Coordinates>) {
        self.destination = destination;
    }

    /// Apply a live courier position: animate the marker, extend the trail,
    /// and re-fit the viewport so both markers stay visible.
    pub fn update_courier_position(&mut self, sample: &LocationSample, now: Instant) {
        self.apply_courier_position(sample, now, false);
    }

    /// Place the courier from persisted order data without touching the
    /// viewport. Used while building the initial view.
    pub fn seed_courier_position(&mut self, sample: &LocationSample, now: Instant) {
        self.apply_courier_position(sample, now, true);
    }

    fn apply_courier_position(&mut self, sample: &LocationSample, now: Instant, initial: bool) {
        self.trail.push_back(sample.clone());
        if self.trail.len() > TRAIL_CAP {
            self.trail.pop_front();
        }

        let target = sample.coordinates();
        match &mut self.courier {
            Some(marker) => {
                // Glide from wherever the marker is rendered right now, which
                // also cancels any animation still in flight.
                let from = marker.position_at(now);
                marker.animation = Some(MarkerAnimation::new(from, target, now));
                marker.target = target;
            }
            None => {
                self.courier = Some(CourierMarker {
                    target,
                    animation: None,
                });
            }
        }

        if !initial {
            self.fit_to_markers();
        }
    }

    /// Rendered courier position at `now`, mid-animation when one is running.
    pub fn courier_position(&self, now: Instant) -> Option<Coordinates> {
        self.courier.as_ref().map(|marker| marker.position_at(now))
    }

    /// Latest reported courier position, ignoring animation.
    pub fn courier_target(&self) -> Option<Coordinates> {
        self.courier.as_ref().map(|marker| marker.target)
    }

    pub fn destination(&self) -> Option<Coordinates> {
        self.destination
    }

    /// Distance and ETA from the latest reported position to the destination.
    pub fn route_estimate(&self) -> Option<RouteEstimate> {
        let courier = self.courier_target()?;
        let destination = self.destination?;

        let distance_km = geo::haversine_km(courier, destination);
        Some(RouteEstimate {
            distance_km,
            eta_minutes: geo::eta_minutes(distance_km),
        })
    }

    pub fn trail(&self) -> impl Iterator<Item = &LocationSample> {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport_size(&mut self, width_px: u32, height_px: u32) {
        self.viewport.width_px = width_px;
        self.viewport.height_px = height_px;
    }

    pub fn base_layer(&self) -> &'static TileLayer {
        &BASE_LAYERS[self.base_layer]
    }

    /// Switch the base layer by its display name. Returns false for names not
    /// in the layer control.
    pub fn select_base_layer(&mut self, name: &str) -> bool {
        match BASE_LAYERS.iter().position(|layer| layer.name == name) {
            Some(index) => {
                self.base_layer = index;
                true
            }
            None => false,
        }
    }

    /// Recenter and rezoom so both markers are visible with padding, capped
    /// at street-level zoom. Does nothing unless both markers exist.
    pub fn fit_to_markers(&mut self) {
        let (Some(courier), Some(destination)) = (self.courier_target(), self.destination) else {
            return;
        };

        let (ax, ay) = project(courier);
        let (bx, by) = project(destination);

        let span_x = (ax - bx).abs();
        let span_y = (ay - by).abs();

        let usable_w = f64::from(self.viewport.width_px.saturating_sub(2 * FIT_PADDING_PX).max(1));
        let usable_h = f64::from(
            self.viewport
                .height_px
                .saturating_sub(2 * FIT_PADDING_PX)
                .max(1),
        );

        let zoom_x = zoom_for_span(usable_w, span_x);
        let zoom_y = zoom_for_span(usable_h, span_y);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let zoom = zoom_x
            .min(zoom_y)
            .min(f64::from(MAX_FIT_ZOOM))
            .max(0.0)
            .floor() as u8;

        self.viewport.center = unproject((ax + bx) / 2.0, (ay + by) / 2.0);
        self.viewport.zoom = zoom;
    }
}

/// Zoom at which a world-fraction span fills `usable_px`. Unbounded when the
/// span collapses to a point.
fn zoom_for_span(usable_px: f64, span: f64) -> f64 {
    if span <= 0.0 {
        f64::INFINITY
    } else {
        (usable_px / (TILE_SIZE_PX * span)).log2()
    }
}

/// Web-mercator projection onto the unit square.
fn project(coords: Coordinates) -> (f64, f64) {
    let x = (coords.lng + 180.0) / 360.0;
    let lat_rad = coords.lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

fn unproject(x: f64, y: f64) -> Coordinates {
    let lng = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    Coordinates { lat, lng }
}
