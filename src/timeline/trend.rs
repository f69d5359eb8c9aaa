//! Next-hour trend and peak derived from a resolved timeline.

use crate::timeline::{HOURS_PER_DAY, HourSlot, PeakHour, TrendDirection, hour_label};

#[derive(Debug, Clone, PartialEq)]
pub struct Trend {
    pub current_occupancy: f64,
    pub magnitude: f64,
    pub direction: TrendDirection,
    pub next_hour_label: String,
}

/// Compares the current hour against the next one.
///
/// Hour 23 compares against hour 0 of the same timeline, not the next day.
pub fn compute_trend(slots: &[HourSlot], current_hour: u8) -> Trend {
    let current_hour = current_hour % HOURS_PER_DAY as u8;
    let next_hour = (current_hour + 1) % HOURS_PER_DAY as u8;
    let current = occupancy_at(slots, current_hour);
    let next = occupancy_at(slots, next_hour);
    let delta = next - current;

    Trend {
        current_occupancy: current,
        magnitude: delta.abs(),
        direction: if delta >= 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        },
        next_hour_label: hour_label(next_hour),
    }
}

/// Earliest hour holding the highest resolved occupancy.
pub fn peak_hour(slots: &[HourSlot]) -> Option<PeakHour> {
    slots
        .iter()
        .filter_map(|slot| {
            slot.resolved_occupancy.map(|occupancy| PeakHour {
                hour: slot.hour_index,
                occupancy,
            })
        })
        .fold(None, |best: Option<PeakHour>, candidate| match best {
            Some(best) if best.occupancy >= candidate.occupancy => Some(best),
            _ => Some(candidate),
        })
}

fn occupancy_at(slots: &[HourSlot], hour: u8) -> f64 {
    slots
        .iter()
        .find(|slot| slot.hour_index == hour)
        .map(HourSlot::occupancy_or_zero)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::ResolutionRule;

    fn slots(values: &[f64]) -> Vec<HourSlot> {
        (0..HOURS_PER_DAY)
            .map(|hour| HourSlot {
                hour_index: hour as u8,
                resolved_occupancy: Some(values.get(hour).copied().unwrap_or(0.0)),
                predicted_occupancy: None,
                is_forecast: false,
                raw_samples: Vec::new(),
                rule: ResolutionRule::StoredAggregate,
            })
            .collect()
    }

    #[test]
    fn falling_occupancy_is_down_with_absolute_magnitude() {
        let mut values = vec![0.0; HOURS_PER_DAY];
        values[16] = 69.0;
        values[17] = 54.0;

        let trend = compute_trend(&slots(&values), 16);

        assert_eq!(trend.current_occupancy, 69.0);
        assert_eq!(trend.magnitude, 15.0);
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.next_hour_label, "17:00");
    }

    #[test]
    fn flat_occupancy_counts_as_up() {
        let values = vec![34.0; HOURS_PER_DAY];

        let trend = compute_trend(&slots(&values), 8);

        assert_eq!(trend.magnitude, 0.0);
        assert_eq!(trend.direction, TrendDirection::Up);
    }

    #[test]
    fn last_hour_compares_against_hour_zero_of_same_day() {
        let mut values = vec![0.0; HOURS_PER_DAY];
        values[0] = 5.0;
        values[23] = 21.0;

        let trend = compute_trend(&slots(&values), 23);

        assert_eq!(trend.current_occupancy, 21.0);
        assert_eq!(trend.magnitude, 16.0);
        assert_eq!(trend.direction, TrendDirection::Down);
        assert_eq!(trend.next_hour_label, "00:00");
    }

    #[test]
    fn peak_prefers_earliest_maximum() {
        let mut values = vec![10.0; HOURS_PER_DAY];
        values[8] = 87.0;
        values[12] = 87.0;

        let peak = peak_hour(&slots(&values));

        assert_eq!(
            peak,
            Some(PeakHour {
                hour: 8,
                occupancy: 87.0
            })
        );
    }
}
