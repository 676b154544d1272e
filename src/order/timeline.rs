use chrono::{DateTime, Utc};

use super::{OrderStatus, StatusEntry};

/// How one fulfilment stage relates to the order's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Completed,
    Active,
    Pending,
}

/// One row of the rendered status timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineStage {
    pub status: OrderStatus,
    pub state: StageState,
    /// Timestamp of the first history entry recorded for this stage.
    pub timestamp: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Full projection of an order's progress onto the fulfilment pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub stages: Vec<TimelineStage>,
    pub current: OrderStatus,
}

impl Timeline {
    pub fn active_stage(&self) -> Option<&TimelineStage> {
        self.stages
            .iter()
            .find(|stage| stage.state == StageState::Active)
    }

    pub fn completed_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| stage.state == StageState::Completed)
            .count()
    }
}

/// Project the current status and its history onto the seven ranked stages.
///
/// Stages with a lower rank than the current status are completed, the equal
/// rank is active, the rest are pending. A status with no rank (`cancelled`
/// or unrecognized) completes and activates nothing; the caller still shows
/// its raw label as the current status. The projection is a full rebuild, so
/// replaying a stale or duplicate update converges to the same result.
pub fn build_timeline(current: &OrderStatus, history: &[StatusEntry]) -> Timeline {
    let current_rank = current.rank().unwrap_or(0);

    let stages = OrderStatus::STAGES
        .iter()
        .map(|stage| {
            let rank = stage.rank().unwrap_or(0);
            let state = if stage == current {
                StageState::Active
            } else if rank < current_rank {
                StageState::Completed
            } else {
                StageState::Pending
            };

            let entry = history.iter().find(|entry| &entry.status == stage);

            TimelineStage {
                status: stage.clone(),
                state,
                timestamp: entry.and_then(|entry| entry.timestamp),
                note: entry.and_then(|entry| entry.note.clone()),
            }
        })
        .collect();

    Timeline {
        stages,
        current: current.clone(),
    }
}
