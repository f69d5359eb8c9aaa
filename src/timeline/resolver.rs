//! Occupancy resolution: picks the authoritative value for each hour of a
//! garage-day from live readings, the stored aggregate and the prediction.
//!
//! Past and today timelines run every hour through [`RESOLUTION_CHAIN`] in
//! increasing hour order; the first rule that yields a value wins. Future
//! timelines bypass the chain and take the prediction verbatim.

use crate::timeline::bucket::{HourBuckets, bucket_by_hour};
use crate::timeline::mode::{TemporalMode, temporal_mode};
use crate::timeline::trend::{compute_trend, peak_hour};
use crate::timeline::{DayAggregate, GarageTimeline, HOURS_PER_DAY, HourSlot, RawSample};
use serde::Serialize;
use time::{Date, PrimitiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    /// Most recent raw sample of the current hour.
    LiveReading,
    StoredAggregate,
    /// Current hour with no data yet reuses the previous hour.
    CarryForward,
    /// Prediction for an hour after the current one.
    Forecast,
    ZeroFallback,
    /// Future-date fast path, outside the chain.
    PredictionOnly,
}

pub const RESOLUTION_CHAIN: [ResolutionRule; 5] = [
    ResolutionRule::LiveReading,
    ResolutionRule::StoredAggregate,
    ResolutionRule::CarryForward,
    ResolutionRule::Forecast,
    ResolutionRule::ZeroFallback,
];

/// Everything one hour's resolution may look at.
#[derive(Debug, Clone, Copy)]
pub struct HourContext<'a> {
    /// The aggregate fetch succeeded. Without it only the live reading,
    /// forecast and zero rules apply.
    pub aggregate_available: bool,
    /// Today's timeline and this is the wall-clock hour.
    pub live: bool,
    /// Today's timeline and this hour is strictly after the wall-clock hour.
    pub after_current: bool,
    pub bucket: &'a [RawSample],
    pub stored: Option<f64>,
    pub predicted: Option<f64>,
    /// Resolved value of the preceding hour (23 for hour 0).
    pub previous: Option<f64>,
}

impl ResolutionRule {
    pub fn apply(self, ctx: &HourContext<'_>) -> Option<f64> {
        match self {
            ResolutionRule::LiveReading => {
                if ctx.live {
                    ctx.bucket.last().map(|sample| sample.value)
                } else {
                    None
                }
            }
            ResolutionRule::StoredAggregate => ctx.stored,
            ResolutionRule::CarryForward => {
                if ctx.aggregate_available
                    && ctx.live
                    && ctx.bucket.is_empty()
                    && ctx.stored.is_none()
                {
                    ctx.previous
                } else {
                    None
                }
            }
            ResolutionRule::Forecast => {
                if ctx.after_current {
                    ctx.predicted
                } else {
                    None
                }
            }
            ResolutionRule::ZeroFallback => Some(0.0),
            ResolutionRule::PredictionOnly => ctx.predicted,
        }
    }
}

/// First applicable rule of the chain and the value it yields.
pub fn resolve_hour(ctx: &HourContext<'_>) -> (f64, ResolutionRule) {
    RESOLUTION_CHAIN
        .iter()
        .find_map(|rule| rule.apply(ctx).map(|value| (value, *rule)))
        .unwrap_or((0.0, ResolutionRule::ZeroFallback))
}

/// Builds the authoritative timeline for `garage_id` on `date` as seen at
/// `now`.
///
/// `aggregate` is `None` when the aggregate fetch failed or was not eligible;
/// every hour then resolves through the live reading, forecast and zero rules
/// only, with no stored values and no raw samples. `prediction` is `None` when no forecast is available.
pub fn reconcile(
    garage_id: &str,
    date: Date,
    now: PrimitiveDateTime,
    aggregate: Option<&DayAggregate>,
    prediction: Option<&[f64]>,
) -> GarageTimeline {
    let mode = temporal_mode(date, now.date());
    let current_hour = now.hour();

    let slots = match mode {
        TemporalMode::Future => prediction_only_slots(prediction),
        TemporalMode::Past | TemporalMode::Today => {
            let buckets = aggregate
                .map(|aggregate| bucket_by_hour(&aggregate.raw_samples))
                .unwrap_or_default();
            let inputs = ChainInputs {
                mode,
                current_hour,
                buckets: &buckets,
                aggregate,
                prediction,
            };
            inputs.resolve_slots()
        }
    };

    let trend = compute_trend(&slots, current_hour);
    let peak = peak_hour(&slots);

    GarageTimeline {
        garage_id: garage_id.to_string(),
        date,
        mode,
        slots,
        current_occupancy: trend.current_occupancy,
        trend_magnitude: trend.magnitude,
        trend_direction: trend.direction,
        next_hour_label: trend.next_hour_label,
        peak,
    }
}

fn prediction_only_slots(prediction: Option<&[f64]>) -> Vec<HourSlot> {
    (0..HOURS_PER_DAY as u8)
        .map(|hour| {
            let predicted = predicted_at(prediction, hour);
            HourSlot {
                hour_index: hour,
                resolved_occupancy: predicted,
                predicted_occupancy: predicted,
                is_forecast: true,
                raw_samples: Vec::new(),
                rule: ResolutionRule::PredictionOnly,
            }
        })
        .collect()
}

fn predicted_at(prediction: Option<&[f64]>, hour: u8) -> Option<f64> {
    prediction.and_then(|values| values.get(hour as usize).copied())
}

struct ChainInputs<'a> {
    mode: TemporalMode,
    current_hour: u8,
    buckets: &'a HourBuckets,
    aggregate: Option<&'a DayAggregate>,
    prediction: Option<&'a [f64]>,
}

impl<'a> ChainInputs<'a> {
    fn context(&self, hour: u8, previous: Option<f64>) -> HourContext<'a> {
        let live_day = self.mode.is_live();
        HourContext {
            aggregate_available: self.aggregate.is_some(),
            live: live_day && hour == self.current_hour,
            after_current: live_day && hour > self.current_hour,
            bucket: self.buckets.get(hour),
            stored: self.aggregate.and_then(|aggregate| aggregate.value_at(hour)),
            predicted: predicted_at(self.prediction, hour),
            previous,
        }
    }

    /// Hours resolve in increasing order so carry-forward sees its
    /// predecessor. Hour 0 wraps to hour 23, which can never be the live
    /// hour at that point, so it is resolved ahead without a predecessor.
    fn resolve_slots(&self) -> Vec<HourSlot> {
        let mut slots: Vec<HourSlot> = Vec::with_capacity(HOURS_PER_DAY);
        for hour in 0..HOURS_PER_DAY as u8 {
            let previous = match slots.last() {
                Some(slot) => slot.resolved_occupancy,
                None => self.wrapped_predecessor(),
            };
            let ctx = self.context(hour, previous);
            let (value, rule) = resolve_hour(&ctx);
            slots.push(HourSlot {
                hour_index: hour,
                resolved_occupancy: Some(value),
                predicted_occupancy: ctx.predicted,
                is_forecast: ctx.after_current,
                raw_samples: ctx.bucket.to_vec(),
                rule,
            });
        }
        slots
    }

    fn wrapped_predecessor(&self) -> Option<f64> {
        if !(self.aggregate.is_some() && self.mode.is_live() && self.current_hour == 0) {
            return None;
        }
        let last_hour = HOURS_PER_DAY as u8 - 1;
        Some(resolve_hour(&self.context(last_hour, None)).0)
    }
}
