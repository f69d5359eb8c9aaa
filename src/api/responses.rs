use crate::timeline::{ResolutionRule, TemporalMode, TrendDirection};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthSuccessResponse {
    pub status: HealthStatus,
    pub timestamp: String,
}

/// Summary card for one garage as seen today.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GarageSummaryResponse {
    pub id: String,
    pub name: String,
    pub current_occupancy: f64,
    pub trend: f64,
    pub trend_direction: TrendDirection,
    pub next_hour: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GaragesSuccessResponse {
    pub garages: Vec<GarageSummaryResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RawSampleResponse {
    pub time: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HourSlotResponse {
    pub time: String,
    pub hour: u8,
    pub occupancy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted: Option<f64>,
    pub forecast: bool,
    pub source: ResolutionRule,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raw_data: Vec<RawSampleResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PeakResponse {
    pub time: String,
    pub occupancy: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TimelineSuccessResponse {
    pub garage_id: String,
    pub date: String,
    pub mode: TemporalMode,
    pub current_occupancy: f64,
    pub trend: f64,
    pub trend_direction: TrendDirection,
    pub next_hour: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak: Option<PeakResponse>,
    pub hours: Vec<HourSlotResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WindowResponse {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ProfileSuccessResponse {
    pub garage_id: String,
    pub weekday: u8,
    pub hourly_averages: Vec<f64>,
    pub sample_count: usize,
    pub high_occupancy_windows: Vec<WindowResponse>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DatesSuccessResponse {
    pub garage_id: String,
    pub dates: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UnknownGarage,
    InvalidDate,
    InvalidWeekday,
    SourceUnavailable,
    InternalError,
}
