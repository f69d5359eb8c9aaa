use crate::error::AppError;
use crate::reconcile::Sources;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarageInfo {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
}

impl GarageInfo {
    /// Matches the canonical id or any alias, ignoring ASCII case.
    pub fn answers_to(&self, key: &str) -> bool {
        self.id.eq_ignore_ascii_case(key)
            || self
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(key))
    }
}

/// Shared, read-only request state.
#[derive(Debug)]
pub struct AppState {
    garages: Vec<GarageInfo>,
    sources: Sources,
    utc_offset: UtcOffset,
}

impl AppState {
    pub fn new(garages: Vec<GarageInfo>, sources: Sources, utc_offset: UtcOffset) -> Self {
        Self {
            garages,
            sources,
            utc_offset,
        }
    }

    pub fn garages(&self) -> &[GarageInfo] {
        &self.garages
    }

    pub fn garage_ids(&self) -> Vec<String> {
        self.garages.iter().map(|garage| garage.id.clone()).collect()
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn find_garage(&self, key: &str) -> Result<&GarageInfo, AppError> {
        let key = key.trim();
        self.garages
            .iter()
            .find(|garage| garage.answers_to(key))
            .ok_or_else(|| AppError::UnknownGarage(key.to_string()))
    }

    /// Current instant in the garages' configured offset. The offset is fixed,
    /// so across a daylight-saving change the local hour is off by one until
    /// the config is updated.
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.utc_offset)
    }
}

/// Local wall-clock reading of `now`, as the resolver expects it.
pub fn wall_clock(now: OffsetDateTime) -> PrimitiveDateTime {
    PrimitiveDateTime::new(now.date(), now.time())
}
