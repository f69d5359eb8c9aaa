//! Upstream collaborators: the aggregate store, the prediction model and the
//! historical timeline archive.
//!
//! Every implementation bounds its own I/O and reports any transport, parse
//! or timeout failure as [`AppError::SourceUnavailable`]. Retrying is left to
//! the implementation; the reconcile layer only degrades.

use crate::error::AppError;
use crate::timeline::{DayAggregate, GarageTimeline};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub mod file;
pub mod mock;
pub mod remote;

pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(text: &str) -> Result<Date, AppError> {
    Date::parse(text, DATE_FORMAT).map_err(|_| AppError::InvalidDate(text.to_string()))
}

/// Which day a prediction is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionTarget {
    Date(Date),
    Tomorrow,
}

impl PredictionTarget {
    pub fn for_date(date: Date, today: Date) -> Self {
        if today.next_day() == Some(date) {
            PredictionTarget::Tomorrow
        } else {
            PredictionTarget::Date(date)
        }
    }
}

impl fmt::Display for PredictionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionTarget::Date(date) => write!(f, "{date}"),
            PredictionTarget::Tomorrow => f.write_str("tomorrow"),
        }
    }
}

/// Wire shape of a per-hour forecast.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyPrediction {
    pub hourly_values: Vec<f64>,
}

#[async_trait]
pub trait AggregateSource: Send + Sync + fmt::Debug {
    async fn fetch_aggregate(&self, garage_id: &str, date: Date) -> Result<DayAggregate, AppError>;

    /// Dates with a stored aggregate, ascending.
    async fn available_dates(&self, _garage_id: &str) -> Result<Vec<Date>, AppError> {
        Ok(Vec::new())
    }
}

#[async_trait]
pub trait PredictionSource: Send + Sync + fmt::Debug {
    /// Per-hour forecast, index 0 is midnight.
    async fn fetch_prediction(
        &self,
        garage_id: &str,
        target: PredictionTarget,
    ) -> Result<Vec<f64>, AppError>;
}

#[async_trait]
pub trait HistorySource: Send + Sync + fmt::Debug {
    /// Resolved timelines for `weekday` (0 = Monday) strictly before `before`.
    async fn fetch_history(
        &self,
        garage_id: &str,
        weekday: u8,
        before: Date,
    ) -> Result<Vec<GarageTimeline>, AppError>;
}
