use std::fmt;
use thiserror::Error;

/// Upstream collaborator a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Aggregate,
    Prediction,
    History,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Aggregate => f.write_str("aggregate"),
            SourceKind::Prediction => f.write_str("prediction"),
            SourceKind::History => f.write_str("history"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{kind} source unavailable: {reason}")]
    SourceUnavailable { kind: SourceKind, reason: String },
    #[error("no historical timelines supplied")]
    EmptyHistory,
    #[error("unknown garage: {0}")]
    UnknownGarage(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("invalid weekday: {0} (expected 0-6)")]
    InvalidWeekday(String),
}

impl AppError {
    pub fn unavailable(kind: SourceKind, reason: impl Into<String>) -> Self {
        AppError::SourceUnavailable {
            kind,
            reason: reason.into(),
        }
    }
}
