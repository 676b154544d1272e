//! Terminal rendering of a tracking session snapshot.
//!
//! Rendering is read-only: the session produces a [`TrackingView`] and this
//! module turns it into lines of text. Rendering the same snapshot twice
//! yields the same panel.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::geo::Coordinates;
use crate::i18n::{self, Locale};
use crate::map::{RouteEstimate, TileLayer, Viewport};
use crate::order::{Courier, LineItem, OrderStatus, StageState, Timeline, format_kwd};

/// Immutable snapshot of everything the tracking panel shows.
#[derive(Debug, Clone)]
pub struct TrackingView {
    pub order_number: String,
    pub locale: Locale,
    pub status: OrderStatus,
    pub timeline: Timeline,
    pub courier: Option<Courier>,
    pub courier_position: Option<Coordinates>,
    pub destination: Option<Coordinates>,
    pub estimate: Option<RouteEstimate>,
    pub trail_len: usize,
    pub viewport: Viewport,
    pub base_layer: &'static TileLayer,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub last_update: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Render the tracking panel for one snapshot.
pub fn render(view: &TrackingView) -> String {
    let locale = view.locale;
    let mut lines = Vec::new();

    lines.push(format!(
        "{} · {}",
        i18n::translate(locale, "track_your_order"),
        view.order_number
    ));

    let mut status_line = format!(
        "{}: {}",
        i18n::translate(locale, "current_status_label"),
        i18n::status_label(locale, &view.status)
    );
    if view.active && view.courier_position.is_some() {
        status_line.push_str(&format!(" [{}]", i18n::translate(locale, "live_status")));
    }
    lines.push(status_line);

    lines.push(String::new());
    lines.push(i18n::translate(locale, "order_status_title").to_string());
    for stage in &view.timeline.stages {
        let mut line = format!(
            "  {} {}",
            stage_glyph(stage.state),
            i18n::status_label(locale, &stage.status)
        );
        if let Some(timestamp) = stage.timestamp {
            line.push_str(&format!("  {}", stamp(timestamp)));
        }
        if let Some(note) = &stage.note {
            line.push_str(&format!(" ({note})"));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push(i18n::translate(locale, "live_tracking").to_string());
    match &view.courier {
        Some(courier) => {
            let phone = courier
                .phone
                .as_deref()
                .unwrap_or_else(|| i18n::translate(locale, "no_phone"));
            lines.push(format!("  {} · {}", courier.name, phone));
        }
        None => {
            lines.push(format!(
                "  {} · {}",
                i18n::translate(locale, "no_pilot"),
                i18n::translate(locale, "waiting_assignment")
            ));
        }
    }
    if let Some(estimate) = view.estimate {
        lines.push(format!(
            "  {}: {} mins",
            i18n::translate(locale, "estimated_arrival"),
            estimate.eta_minutes
        ));
        lines.push(format!(
            "  {}: {:.2} km",
            i18n::translate(locale, "distance_label"),
            estimate.distance_km
        ));
    }
    if let Some(last_update) = view.last_update {
        lines.push(format!(
            "  {}: {}",
            i18n::translate(locale, "last_update"),
            last_update.format("%H:%M:%S")
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "{} ({}) · zoom {}",
        view.base_layer.name, view.base_layer.attribution, view.viewport.zoom
    ));
    lines.push(format!("  {}", coordinate(view.viewport.center)));
    if let Some(position) = view.courier_position {
        lines.push(format!("  → {}", coordinate(position)));
    }
    if let Some(destination) = view.destination {
        lines.push(format!(
            "  {} {}",
            i18n::translate(locale, "delivery_destination"),
            coordinate(destination)
        ));
    }
    if view.trail_len >= 2 {
        lines.push(format!("  Trail: {} fixes", view.trail_len));
    }

    if !view.items.is_empty() {
        lines.push(String::new());
        for item in &view.items {
            lines.push(format!(
                "  {} × {} · {}",
                item.name,
                item.quantity,
                format_kwd(item.line_total())
            ));
        }
        lines.push(format!(
            "{}: {}",
            i18n::translate(locale, "total"),
            format_kwd(view.total)
        ));
    }

    lines.join("\n")
}

/// Render the panel shown when the order number matched nothing.
pub fn render_not_found(locale: Locale, order_number: &str) -> String {
    format!(
        "{}\n{} ({order_number})",
        i18n::translate(locale, "no_order_found"),
        i18n::translate(locale, "no_order_msg")
    )
}

fn stage_glyph(state: StageState) -> &'static str {
    match state {
        StageState::Completed => "✓",
        StageState::Active => "●",
        StageState::Pending => "○",
    }
}

fn coordinate(position: Coordinates) -> String {
    format!("({:.4}, {:.4})", position.lat, position.lng)
}

fn stamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%d %b %H:%M").to_string()
}
