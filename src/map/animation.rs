use std::time::{Duration, Instant};

use crate::geo::Coordinates;

/// How long a courier marker glides between two reported positions.
pub(crate) const MARKER_GLIDE: Duration = Duration::from_millis(1000);

/// An in-flight marker movement, sampled at render time.
///
/// The animation is pure data; nothing ticks it. Callers ask for the position
/// at a given instant, which makes redraws idempotent and keeps timers out of
/// the map model. Starting a new animation from the currently rendered
/// position replaces (and thereby cancels) the old one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MarkerAnimation {
    from: Coordinates,
    to: Coordinates,
    started_at: Instant,
    duration: Duration,
}

impl MarkerAnimation {
    pub(crate) fn new(from: Coordinates, to: Coordinates, now: Instant) -> Self {
        Self {
            from,
            to,
            started_at: now,
            duration: MARKER_GLIDE,
        }
    }

    fn progress(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    /// Rendered position at `now`, eased with a cubic ease-out curve.
    pub(crate) fn position_at(&self, now: Instant) -> Coordinates {
        let eased = 1.0 - (1.0 - self.progress(now)).powi(3);

        Coordinates {
            lat: self.from.lat + (self.to.lat - self.from.lat) * eased,
            lng: self.from.lng + (self.to.lng - self.from.lng) * eased,
        }
    }

    pub(crate) fn is_complete(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}
