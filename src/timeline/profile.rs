//! Per-weekday, per-hour historical baseline.

use crate::error::AppError;
use crate::timeline::{DayProfile, GarageTimeline, HOURS_PER_DAY};
use tracing::debug;

/// Averages resolved occupancy per hour across `history`.
///
/// Missing and zero-fallback hours count as zero; callers that want averages
/// over real data only must filter the timelines they pass in. An empty
/// history yields an all-zero profile.
pub fn build_profile(garage_id: &str, weekday: u8, history: &[GarageTimeline]) -> DayProfile {
    try_build_profile(garage_id, weekday, history).unwrap_or_else(|err| {
        debug!(garage_id, weekday, error = %err, "Using all-zero profile");
        DayProfile::zeroed(garage_id, weekday)
    })
}

pub fn try_build_profile(
    garage_id: &str,
    weekday: u8,
    history: &[GarageTimeline],
) -> Result<DayProfile, AppError> {
    if history.is_empty() {
        return Err(AppError::EmptyHistory);
    }

    let mut sums = [0.0; HOURS_PER_DAY];
    for timeline in history {
        for slot in &timeline.slots {
            if let Some(sum) = sums.get_mut(slot.hour_index as usize) {
                *sum += slot.occupancy_or_zero();
            }
        }
    }

    let count = history.len() as f64;
    Ok(DayProfile {
        garage_id: garage_id.to_string(),
        weekday,
        hourly_averages: sums.map(|sum| sum / count),
        sample_count: history.len(),
    })
}
