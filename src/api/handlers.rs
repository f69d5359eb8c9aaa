use crate::api::responses::{
    DatesSuccessResponse, ErrorCode, ErrorResponse, GarageSummaryResponse, GaragesSuccessResponse,
    HealthStatus, HealthSuccessResponse, HourSlotResponse, PeakResponse, ProfileSuccessResponse,
    RawSampleResponse, TimelineSuccessResponse, WindowResponse,
};
use crate::error::AppError;
use crate::reconcile::{ProfileReport, profile_report, resolve, resolve_all};
use crate::sources::parse_date;
use crate::state::{AppState, wall_clock};
use crate::timeline::{GarageTimeline, hour_label};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success(T),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub weekday: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatesQuery {
    pub garage: Option<String>,
}

pub async fn get_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    build_health_response(state.now())
}

pub async fn get_garages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = state.now();
    build_garages_response(&state, now).await
}

pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TimelineQuery>,
) -> impl IntoResponse {
    let now = state.now();
    build_timeline_response(&state, &id, query.date.as_deref(), now).await
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> impl IntoResponse {
    let now = state.now();
    build_profile_response(&state, &id, query.weekday.as_deref(), now).await
}

pub async fn get_dates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DatesQuery>,
) -> impl IntoResponse {
    let now = state.now();
    build_dates_response(&state, query.garage.as_deref(), now).await
}

fn build_health_response(now: OffsetDateTime) -> ApiResponse<HealthSuccessResponse> {
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success(HealthSuccessResponse {
            status: HealthStatus::Ok,
            timestamp,
        }),
        Err(_) => internal_error("/api/health", "timestamp formatting failure"),
    }
}

async fn build_garages_response(
    state: &AppState,
    now: OffsetDateTime,
) -> ApiResponse<GaragesSuccessResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/garages", "timestamp formatting failure"),
    };

    let timelines = resolve_all(
        state.sources(),
        &state.garage_ids(),
        now.date(),
        wall_clock(now),
    )
    .await;

    let garages = state
        .garages()
        .iter()
        .zip(timelines)
        .map(|(garage, timeline)| GarageSummaryResponse {
            id: garage.id.clone(),
            name: garage.name.clone(),
            current_occupancy: timeline.current_occupancy,
            trend: timeline.trend_magnitude,
            trend_direction: timeline.trend_direction,
            next_hour: timeline.next_hour_label,
        })
        .collect();

    ApiResponse::Success(GaragesSuccessResponse { garages, timestamp })
}

async fn build_timeline_response(
    state: &AppState,
    garage_key: &str,
    date_param: Option<&str>,
    now: OffsetDateTime,
) -> ApiResponse<TimelineSuccessResponse> {
    let garage = match state.find_garage(garage_key) {
        Ok(garage) => garage,
        Err(err) => return error_response(&err, now),
    };
    let date = match parse_date_param(date_param, now.date()) {
        Ok(date) => date,
        Err(err) => return error_response(&err, now),
    };
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/garages/{id}/timeline", "timestamp formatting failure"),
    };

    let timeline = resolve(state.sources(), &garage.id, date, wall_clock(now)).await;
    ApiResponse::Success(map_timeline(timeline, timestamp))
}

async fn build_profile_response(
    state: &AppState,
    garage_key: &str,
    weekday_param: Option<&str>,
    now: OffsetDateTime,
) -> ApiResponse<ProfileSuccessResponse> {
    let garage = match state.find_garage(garage_key) {
        Ok(garage) => garage,
        Err(err) => return error_response(&err, now),
    };
    let today = now.date();
    let weekday = match parse_weekday_param(weekday_param, today) {
        Ok(weekday) => weekday,
        Err(err) => return error_response(&err, now),
    };
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/garages/{id}/profile", "timestamp formatting failure"),
    };

    let report = profile_report(state.sources(), &garage.id, weekday, today).await;
    ApiResponse::Success(map_profile(report, timestamp))
}

async fn build_dates_response(
    state: &AppState,
    garage_param: Option<&str>,
    now: OffsetDateTime,
) -> ApiResponse<DatesSuccessResponse> {
    let garage = match state.find_garage(garage_param.unwrap_or_default()) {
        Ok(garage) => garage,
        Err(err) => return error_response(&err, now),
    };
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("/api/dates", "timestamp formatting failure"),
    };

    match state.sources().aggregates.available_dates(&garage.id).await {
        Ok(dates) => ApiResponse::Success(DatesSuccessResponse {
            garage_id: garage.id.clone(),
            dates: dates.iter().map(Date::to_string).collect(),
            timestamp,
        }),
        Err(err) => {
            warn!(garage_id = %garage.id, error = %err, "Listing stored dates failed");
            error_response(&err, now)
        }
    }
}

fn map_timeline(timeline: GarageTimeline, timestamp: String) -> TimelineSuccessResponse {
    let peak = timeline.peak.map(|peak| PeakResponse {
        time: hour_label(peak.hour),
        occupancy: peak.occupancy,
    });
    let hours = timeline
        .slots
        .into_iter()
        .map(|slot| HourSlotResponse {
            time: slot.label(),
            hour: slot.hour_index,
            occupancy: slot.resolved_occupancy,
            predicted: slot.predicted_occupancy,
            forecast: slot.is_forecast,
            source: slot.rule,
            raw_data: slot
                .raw_samples
                .into_iter()
                .map(|sample| RawSampleResponse {
                    time: sample.timestamp,
                    value: sample.value,
                })
                .collect(),
        })
        .collect();

    TimelineSuccessResponse {
        garage_id: timeline.garage_id,
        date: timeline.date.to_string(),
        mode: timeline.mode,
        current_occupancy: timeline.current_occupancy,
        trend: timeline.trend_magnitude,
        trend_direction: timeline.trend_direction,
        next_hour: timeline.next_hour_label,
        peak,
        hours,
        timestamp,
    }
}

fn map_profile(report: ProfileReport, timestamp: String) -> ProfileSuccessResponse {
    let high_occupancy_windows = report
        .windows
        .iter()
        .map(|window| WindowResponse {
            start: window.start_label(),
            end: window.end_label(),
        })
        .collect();

    ProfileSuccessResponse {
        garage_id: report.profile.garage_id,
        weekday: report.profile.weekday,
        hourly_averages: report.profile.hourly_averages.to_vec(),
        sample_count: report.profile.sample_count,
        high_occupancy_windows,
        timestamp,
    }
}

/// Missing or blank means today.
fn parse_date_param(param: Option<&str>, today: Date) -> Result<Date, AppError> {
    match param.map(str::trim) {
        None | Some("") => Ok(today),
        Some(text) => parse_date(text),
    }
}

/// Days from Monday; missing or blank means today's weekday.
fn parse_weekday_param(param: Option<&str>, today: Date) -> Result<u8, AppError> {
    match param.map(str::trim) {
        None | Some("") => Ok(today.weekday().number_days_from_monday()),
        Some(text) => match text.parse::<u8>() {
            Ok(weekday) if weekday < 7 => Ok(weekday),
            _ => Err(AppError::InvalidWeekday(text.to_string())),
        },
    }
}

fn error_response<T>(err: &AppError, now: OffsetDateTime) -> ApiResponse<T> {
    let (status, error_code) = match err {
        AppError::UnknownGarage(_) => (StatusCode::NOT_FOUND, ErrorCode::UnknownGarage),
        AppError::InvalidDate(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidDate),
        AppError::InvalidWeekday(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidWeekday),
        AppError::SourceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::SourceUnavailable)
        }
        AppError::EmptyHistory => {
            error!(error = %err, "Unexpected error reached the API layer");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
        }
    };
    let error_message = if error_code == ErrorCode::InternalError {
        INTERNAL_ERROR_MESSAGE.to_string()
    } else {
        err.to_string()
    };

    ApiResponse::Error {
        status,
        body: ErrorResponse {
            error_code,
            error_message,
            timestamp: timestamp_or_epoch(now),
        },
    }
}

fn internal_error<T>(route: &str, message: &str) -> ApiResponse<T> {
    error!(route, message, "Internal error while handling request");
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: timestamp_or_epoch(OffsetDateTime::now_utc()),
        },
    }
}

fn timestamp_or_epoch(now: OffsetDateTime) -> String {
    format_timestamp(now).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format error timestamp");
        "1970-01-01T00:00:00Z".to_string()
    })
}

fn format_timestamp(now: OffsetDateTime) -> Result<String, TimestampError> {
    now.format(&Rfc3339).map_err(TimestampError::Format)
}
