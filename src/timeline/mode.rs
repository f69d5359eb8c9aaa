//! Classifies a requested date relative to today and decides which upstream
//! sources a reconciliation may consult.

use serde::Serialize;
use std::cmp::Ordering;
use time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalMode {
    Past,
    Today,
    Future,
}

/// Upstream sources eligible for one reconciliation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibleSources {
    pub aggregate: bool,
    pub prediction: bool,
}

pub fn temporal_mode(selected: Date, today: Date) -> TemporalMode {
    match selected.cmp(&today) {
        Ordering::Equal => TemporalMode::Today,
        Ordering::Greater => TemporalMode::Future,
        Ordering::Less => TemporalMode::Past,
    }
}

impl TemporalMode {
    /// Future dates are prediction-only. Past dates still fetch the
    /// prediction so slots can carry actual-vs-predicted variance.
    pub fn eligible_sources(self) -> EligibleSources {
        match self {
            TemporalMode::Past | TemporalMode::Today => EligibleSources {
                aggregate: true,
                prediction: true,
            },
            TemporalMode::Future => EligibleSources {
                aggregate: false,
                prediction: true,
            },
        }
    }

    /// Whether live readings and forecast substitution may apply.
    pub fn is_live(self) -> bool {
        matches!(self, TemporalMode::Today)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemporalMode::Past => "past",
            TemporalMode::Today => "today",
            TemporalMode::Future => "future",
        }
    }
}
