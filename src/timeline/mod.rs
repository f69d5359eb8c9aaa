//! Occupancy timeline model and the pure reconciliation core.
//!
//! Everything under this module is synchronous and deterministic: callers pass
//! the fetched upstream data and the wall-clock `now` explicitly.

use serde::{Deserialize, Serialize};
use time::Date;

pub mod anomaly;
pub mod bucket;
pub mod mode;
pub mod profile;
pub mod resolver;
pub mod trend;

pub use mode::TemporalMode;
pub use resolver::ResolutionRule;

pub const HOURS_PER_DAY: usize = 24;

pub type GarageId = String;

/// Display label for an hour of the day, e.g. `07:00`.
pub fn hour_label(hour: u8) -> String {
    format!("{hour:02}:00")
}

/// One sensor reading as delivered by the aggregate store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSample {
    /// Time of day, `HH:MM` or finer.
    #[serde(alias = "time")]
    pub timestamp: String,
    pub value: f64,
}

impl RawSample {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Stored hourly aggregate plus the raw samples it was computed from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DayAggregate {
    #[serde(default)]
    pub hourly_values: Vec<Option<f64>>,
    #[serde(default, alias = "raw_data")]
    pub raw_samples: Vec<RawSample>,
}

impl DayAggregate {
    /// Stored value for `hour`; hours the upstream omitted read as missing.
    pub fn value_at(&self, hour: u8) -> Option<f64> {
        self.hourly_values.get(hour as usize).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourSlot {
    pub hour_index: u8,
    pub resolved_occupancy: Option<f64>,
    pub predicted_occupancy: Option<f64>,
    pub is_forecast: bool,
    pub raw_samples: Vec<RawSample>,
    pub rule: ResolutionRule,
}

impl HourSlot {
    pub fn label(&self) -> String {
        hour_label(self.hour_index)
    }

    /// Resolved value with the empty-timeline convention applied.
    pub fn occupancy_or_zero(&self) -> f64 {
        self.resolved_occupancy.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakHour {
    pub hour: u8,
    pub occupancy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GarageTimeline {
    pub garage_id: GarageId,
    pub date: Date,
    pub mode: TemporalMode,
    pub slots: Vec<HourSlot>,
    pub current_occupancy: f64,
    pub trend_magnitude: f64,
    pub trend_direction: TrendDirection,
    pub next_hour_label: String,
    pub peak: Option<PeakHour>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayProfile {
    pub garage_id: GarageId,
    /// Days from Monday, 0-6.
    pub weekday: u8,
    pub hourly_averages: [f64; HOURS_PER_DAY],
    pub sample_count: usize,
}

impl DayProfile {
    pub fn zeroed(garage_id: impl Into<GarageId>, weekday: u8) -> Self {
        Self {
            garage_id: garage_id.into(),
            weekday,
            hourly_averages: [0.0; HOURS_PER_DAY],
            sample_count: 0,
        }
    }
}

/// Contiguous run of hours at or above the congestion threshold.
/// `end_hour` is the last hour of the run, so a one-hour run has
/// `start_hour == end_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighOccupancyWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl HighOccupancyWindow {
    pub fn start_label(&self) -> String {
        hour_label(self.start_hour)
    }

    pub fn end_label(&self) -> String {
        hour_label(self.end_hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_label_pads_to_two_digits() {
        assert_eq!(hour_label(0), "00:00");
        assert_eq!(hour_label(7), "07:00");
        assert_eq!(hour_label(23), "23:00");
    }

    #[test]
    fn aggregate_accepts_raw_data_alias_and_short_arrays() -> Result<(), Box<dyn std::error::Error>>
    {
        let aggregate: DayAggregate = serde_json::from_str(
            r#"{"hourly_values": [10, null, 30], "raw_data": [{"time": "02:15", "value": 31}]}"#,
        )?;

        assert_eq!(aggregate.value_at(0), Some(10.0));
        assert_eq!(aggregate.value_at(1), None);
        assert_eq!(aggregate.value_at(2), Some(30.0));
        assert_eq!(aggregate.value_at(23), None);
        assert_eq!(aggregate.raw_samples, vec![RawSample::new("02:15", 31.0)]);
        Ok(())
    }
}
