use crate::error::{AppError, SourceKind};
use crate::sources::{AggregateSource, HistorySource, PredictionSource, PredictionTarget};
use crate::timeline::{DayAggregate, GarageTimeline};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::Date;

/// In-memory upstream with per-source failure switches and call counters.
#[derive(Debug, Default)]
pub struct MockStore {
    aggregates: HashMap<(String, Date), DayAggregate>,
    predictions: HashMap<(String, PredictionTarget), Vec<f64>>,
    history: HashMap<(String, u8), Vec<GarageTimeline>>,
    fail_aggregates: bool,
    fail_predictions: bool,
    fail_history: bool,
    aggregate_calls: AtomicUsize,
    prediction_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aggregate(mut self, garage_id: &str, date: Date, aggregate: DayAggregate) -> Self {
        self.aggregates
            .insert((garage_id.to_string(), date), aggregate);
        self
    }

    pub fn with_prediction(
        mut self,
        garage_id: &str,
        target: PredictionTarget,
        values: Vec<f64>,
    ) -> Self {
        self.predictions
            .insert((garage_id.to_string(), target), values);
        self
    }

    pub fn with_history(
        mut self,
        garage_id: &str,
        weekday: u8,
        timelines: Vec<GarageTimeline>,
    ) -> Self {
        self.history
            .insert((garage_id.to_string(), weekday), timelines);
        self
    }

    pub fn failing_aggregates(mut self) -> Self {
        self.fail_aggregates = true;
        self
    }

    pub fn failing_predictions(mut self) -> Self {
        self.fail_predictions = true;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    pub fn aggregate_calls(&self) -> usize {
        self.aggregate_calls.load(Ordering::Relaxed)
    }

    pub fn prediction_calls(&self) -> usize {
        self.prediction_calls.load(Ordering::Relaxed)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AggregateSource for MockStore {
    async fn fetch_aggregate(&self, garage_id: &str, date: Date) -> Result<DayAggregate, AppError> {
        self.aggregate_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_aggregates {
            return Err(AppError::unavailable(
                SourceKind::Aggregate,
                "mock aggregate failure",
            ));
        }
        self.aggregates
            .get(&(garage_id.to_string(), date))
            .cloned()
            .ok_or_else(|| {
                AppError::unavailable(SourceKind::Aggregate, format!("no aggregate for {date}"))
            })
    }

    async fn available_dates(&self, garage_id: &str) -> Result<Vec<Date>, AppError> {
        if self.fail_aggregates {
            return Err(AppError::unavailable(
                SourceKind::Aggregate,
                "mock aggregate failure",
            ));
        }
        let mut dates: Vec<Date> = self
            .aggregates
            .keys()
            .filter(|(garage, _)| garage == garage_id)
            .map(|(_, date)| *date)
            .collect();
        dates.sort();
        Ok(dates)
    }
}

#[async_trait]
impl PredictionSource for MockStore {
    async fn fetch_prediction(
        &self,
        garage_id: &str,
        target: PredictionTarget,
    ) -> Result<Vec<f64>, AppError> {
        self.prediction_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_predictions {
            return Err(AppError::unavailable(
                SourceKind::Prediction,
                "mock prediction failure",
            ));
        }
        self.predictions
            .get(&(garage_id.to_string(), target))
            .cloned()
            .ok_or_else(|| {
                AppError::unavailable(SourceKind::Prediction, format!("no prediction for {target}"))
            })
    }
}

#[async_trait]
impl HistorySource for MockStore {
    async fn fetch_history(
        &self,
        garage_id: &str,
        weekday: u8,
        before: Date,
    ) -> Result<Vec<GarageTimeline>, AppError> {
        self.history_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_history {
            return Err(AppError::unavailable(
                SourceKind::History,
                "mock history failure",
            ));
        }
        Ok(self
            .history
            .get(&(garage_id.to_string(), weekday))
            .map(|timelines| {
                timelines
                    .iter()
                    .filter(|timeline| timeline.date < before)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
