//! Request-level reconciliation: fetches the eligible upstream sources
//! concurrently, degrades around failures and hands the joined inputs to the
//! pure resolver.

use crate::error::AppError;
use crate::sources::{AggregateSource, HistorySource, PredictionSource, PredictionTarget};
use crate::timeline::anomaly::detect_windows;
use crate::timeline::mode::temporal_mode;
use crate::timeline::profile::build_profile;
use crate::timeline::resolver::reconcile;
use crate::timeline::{DayProfile, GarageTimeline, HighOccupancyWindow};
use futures::future::join_all;
use std::sync::Arc;
use time::{Date, PrimitiveDateTime};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Sources {
    pub aggregates: Arc<dyn AggregateSource>,
    pub predictions: Arc<dyn PredictionSource>,
    pub history: Arc<dyn HistorySource>,
}

impl Sources {
    /// Uses one store for all three upstream roles.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AggregateSource + PredictionSource + HistorySource + 'static,
    {
        Self {
            aggregates: store.clone(),
            predictions: store.clone(),
            history: store,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub profile: DayProfile,
    pub windows: Vec<HighOccupancyWindow>,
}

/// Resolves one garage-day as seen at `now`.
///
/// The aggregate and prediction fetches run concurrently and are joined
/// before resolution. A failed fetch never fails the timeline: that source is
/// treated as absent.
pub async fn resolve(
    sources: &Sources,
    garage_id: &str,
    date: Date,
    now: PrimitiveDateTime,
) -> GarageTimeline {
    let today = now.date();
    let mode = temporal_mode(date, today);
    let eligible = mode.eligible_sources();
    let target = PredictionTarget::for_date(date, today);

    let (aggregate, prediction) = tokio::join!(
        async {
            if eligible.aggregate {
                Some(sources.aggregates.fetch_aggregate(garage_id, date).await)
            } else {
                None
            }
        },
        async {
            if eligible.prediction {
                Some(sources.predictions.fetch_prediction(garage_id, target).await)
            } else {
                None
            }
        },
    );

    let aggregate = settle(aggregate, garage_id, date);
    let prediction = settle(prediction, garage_id, date);

    let timeline = reconcile(
        garage_id,
        date,
        now,
        aggregate.as_ref(),
        prediction.as_deref(),
    );
    debug!(
        garage_id,
        date = %date,
        mode = timeline.mode.as_str(),
        current_occupancy = timeline.current_occupancy,
        "Timeline resolved"
    );
    timeline
}

/// Resolves several garages independently; results follow `garage_ids` order.
pub async fn resolve_all(
    sources: &Sources,
    garage_ids: &[String],
    date: Date,
    now: PrimitiveDateTime,
) -> Vec<GarageTimeline> {
    join_all(
        garage_ids
            .iter()
            .map(|garage_id| resolve(sources, garage_id, date, now)),
    )
    .await
}

/// Builds the weekday baseline from history strictly before `today`. An
/// unavailable history source yields the all-zero profile.
pub async fn build_profile_for(
    sources: &Sources,
    garage_id: &str,
    weekday: u8,
    today: Date,
) -> DayProfile {
    let history = match sources.history.fetch_history(garage_id, weekday, today).await {
        Ok(history) => history,
        Err(err) => {
            warn!(garage_id, weekday, error = %err, "History fetch failed, using empty window");
            Vec::new()
        }
    };
    build_profile(garage_id, weekday, &history)
}

pub async fn profile_report(
    sources: &Sources,
    garage_id: &str,
    weekday: u8,
    today: Date,
) -> ProfileReport {
    let profile = build_profile_for(sources, garage_id, weekday, today).await;
    let windows = detect_windows(&profile);
    ProfileReport { profile, windows }
}

fn settle<T>(outcome: Option<Result<T, AppError>>, garage_id: &str, date: Date) -> Option<T> {
    match outcome? {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(garage_id, date = %date, error = %err, "Upstream fetch failed, degrading");
            None
        }
    }
}
