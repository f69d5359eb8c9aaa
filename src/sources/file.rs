//! JSON file store serving aggregates, predictions and history.
//!
//! Layout under the store root:
//! - `aggregates/<garage>/<YYYY-MM-DD>.json`
//! - `predictions/<garage>/<YYYY-MM-DD>.json` or `predictions/<garage>/tomorrow.json`

use crate::error::{AppError, SourceKind};
use crate::sources::{
    AggregateSource, HistorySource, HourlyPrediction, PredictionSource, PredictionTarget,
    parse_date,
};
use crate::timeline::resolver::reconcile;
use crate::timeline::{DayAggregate, GarageTimeline};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::Date;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    timeout: Duration,
    history_weeks: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration, history_weeks: usize) -> Self {
        Self {
            root: root.into(),
            timeout,
            history_weeks,
        }
    }

    fn aggregate_dir(&self, garage_id: &str) -> PathBuf {
        self.root.join("aggregates").join(garage_id)
    }

    fn aggregate_path(&self, garage_id: &str, date: Date) -> PathBuf {
        self.aggregate_dir(garage_id).join(format!("{date}.json"))
    }

    fn prediction_path(&self, garage_id: &str, target: PredictionTarget) -> PathBuf {
        self.root
            .join("predictions")
            .join(garage_id)
            .join(format!("{target}.json"))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        path: &Path,
        kind: SourceKind,
    ) -> Result<T, AppError> {
        let contents = tokio::time::timeout(self.timeout, tokio::fs::read_to_string(path))
            .await
            .map_err(|_| {
                AppError::unavailable(kind, format!("timed out reading {}", path.display()))
            })?
            .map_err(|err| {
                AppError::unavailable(kind, format!("failed to read {}: {err}", path.display()))
            })?;
        serde_json::from_str(&contents).map_err(|err| {
            AppError::unavailable(kind, format!("failed to parse {}: {err}", path.display()))
        })
    }

    async fn stored_dates(&self, garage_id: &str, kind: SourceKind) -> Result<Vec<Date>, AppError> {
        let dir = self.aggregate_dir(garage_id);
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|err| {
            AppError::unavailable(kind, format!("failed to list {}: {err}", dir.display()))
        })?;

        let mut dates = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|err| {
                AppError::unavailable(kind, format!("failed to list {}: {err}", dir.display()))
            })?;
            let Some(entry) = entry else {
                break;
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(parse_date)
            {
                Some(Ok(date)) => dates.push(date),
                _ => debug!(path = %path.display(), "Ignoring non-date aggregate file"),
            }
        }
        dates.sort();
        Ok(dates)
    }
}

#[async_trait]
impl AggregateSource for FileStore {
    async fn fetch_aggregate(&self, garage_id: &str, date: Date) -> Result<DayAggregate, AppError> {
        let path = self.aggregate_path(garage_id, date);
        self.read_json(&path, SourceKind::Aggregate).await
    }

    async fn available_dates(&self, garage_id: &str) -> Result<Vec<Date>, AppError> {
        self.stored_dates(garage_id, SourceKind::Aggregate).await
    }
}

#[async_trait]
impl PredictionSource for FileStore {
    async fn fetch_prediction(
        &self,
        garage_id: &str,
        target: PredictionTarget,
    ) -> Result<Vec<f64>, AppError> {
        let path = self.prediction_path(garage_id, target);
        let prediction: HourlyPrediction = self.read_json(&path, SourceKind::Prediction).await?;
        Ok(prediction.hourly_values)
    }
}

#[async_trait]
impl HistorySource for FileStore {
    /// Keeps the most recent `history_weeks` matching days. Each stored day is
    /// resolved as seen from the following midnight, so only stored values
    /// apply.
    async fn fetch_history(
        &self,
        garage_id: &str,
        weekday: u8,
        before: Date,
    ) -> Result<Vec<GarageTimeline>, AppError> {
        let matching: Vec<Date> = self
            .stored_dates(garage_id, SourceKind::History)
            .await?
            .into_iter()
            .filter(|date| *date < before && date.weekday().number_days_from_monday() == weekday)
            .collect();
        let skip = matching.len().saturating_sub(self.history_weeks);

        let mut timelines = Vec::with_capacity(matching.len() - skip);
        for date in &matching[skip..] {
            let aggregate = match self.fetch_aggregate(garage_id, *date).await {
                Ok(aggregate) => aggregate,
                Err(err) => {
                    warn!(garage_id, date = %date, error = %err, "Skipping unreadable history day");
                    continue;
                }
            };
            if let Some(as_of) = date.next_day() {
                timelines.push(reconcile(
                    garage_id,
                    *date,
                    as_of.midnight(),
                    Some(&aggregate),
                    None,
                ));
            }
        }
        Ok(timelines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{ResolutionRule, TemporalMode};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::date;

    fn temp_store(label: &str) -> Result<(FileStore, PathBuf), Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let root = std::env::temp_dir().join(format!("garage-flow-{label}-{unique}"));
        fs::create_dir_all(root.join("aggregates").join("north"))?;
        fs::create_dir_all(root.join("predictions").join("north"))?;
        Ok((FileStore::new(&root, Duration::from_secs(2), 2), root))
    }

    fn write_aggregate(root: &Path, date: &str, value: f64) -> std::io::Result<()> {
        let mut hourly = vec![serde_json::Value::Null; 24];
        hourly[9] = serde_json::json!(value);
        let body = serde_json::json!({
            "hourly_values": hourly,
            "raw_data": [{ "time": "09:15", "value": value }]
        });
        fs::write(
            root.join("aggregates")
                .join("north")
                .join(format!("{date}.json")),
            body.to_string(),
        )
    }

    #[tokio::test]
    async fn reads_aggregate_with_raw_samples() -> Result<(), Box<dyn std::error::Error>> {
        let (store, root) = temp_store("aggregate")?;
        write_aggregate(&root, "2026-10-12", 77.0)?;

        let aggregate = store.fetch_aggregate("north", date!(2026 - 10 - 12)).await?;
        let _ = fs::remove_dir_all(&root);

        assert_eq!(aggregate.value_at(9), Some(77.0));
        assert_eq!(aggregate.raw_samples.len(), 1);
        assert_eq!(aggregate.raw_samples[0].timestamp, "09:15");
        Ok(())
    }

    #[tokio::test]
    async fn missing_aggregate_is_source_unavailable() -> Result<(), Box<dyn std::error::Error>> {
        let (store, root) = temp_store("missing")?;

        let result = store.fetch_aggregate("north", date!(2026 - 10 - 12)).await;
        let _ = fs::remove_dir_all(&root);

        assert!(matches!(
            result,
            Err(AppError::SourceUnavailable {
                kind: SourceKind::Aggregate,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_prediction_is_source_unavailable() -> Result<(), Box<dyn std::error::Error>>
    {
        let (store, root) = temp_store("bad-prediction")?;
        fs::write(
            root.join("predictions").join("north").join("tomorrow.json"),
            "{\"hourly_values\": [1, 2,",
        )?;

        let result = store
            .fetch_prediction("north", PredictionTarget::Tomorrow)
            .await;
        let _ = fs::remove_dir_all(&root);

        assert!(matches!(
            result,
            Err(AppError::SourceUnavailable {
                kind: SourceKind::Prediction,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reads_prediction_for_tomorrow() -> Result<(), Box<dyn std::error::Error>> {
        let (store, root) = temp_store("prediction")?;
        let values: Vec<f64> = (0..24).map(|hour| hour as f64).collect();
        fs::write(
            root.join("predictions").join("north").join("tomorrow.json"),
            serde_json::json!({ "hourly_values": values }).to_string(),
        )?;

        let prediction = store
            .fetch_prediction("north", PredictionTarget::Tomorrow)
            .await?;
        let _ = fs::remove_dir_all(&root);

        assert_eq!(prediction, values);
        Ok(())
    }

    #[tokio::test]
    async fn available_dates_are_sorted_and_skip_other_files()
    -> Result<(), Box<dyn std::error::Error>> {
        let (store, root) = temp_store("dates")?;
        write_aggregate(&root, "2026-10-12", 10.0)?;
        write_aggregate(&root, "2026-10-05", 10.0)?;
        fs::write(root.join("aggregates").join("north").join("notes.txt"), "x")?;
        fs::write(root.join("aggregates").join("north").join("latest.json"), "{}")?;

        let dates = store.available_dates("north").await?;
        let _ = fs::remove_dir_all(&root);

        assert_eq!(dates, vec![date!(2026 - 10 - 05), date!(2026 - 10 - 12)]);
        Ok(())
    }

    #[tokio::test]
    async fn history_keeps_recent_matching_weekdays_before_cutoff()
    -> Result<(), Box<dyn std::error::Error>> {
        let (store, root) = temp_store("history")?;
        // Mondays, plus a Tuesday and a Monday on the cutoff.
        write_aggregate(&root, "2026-09-28", 60.0)?;
        write_aggregate(&root, "2026-10-05", 70.0)?;
        write_aggregate(&root, "2026-10-12", 80.0)?;
        write_aggregate(&root, "2026-10-13", 99.0)?;
        write_aggregate(&root, "2026-10-19", 99.0)?;

        let history = store
            .fetch_history("north", 0, date!(2026 - 10 - 19))
            .await?;
        let _ = fs::remove_dir_all(&root);

        let dates: Vec<Date> = history.iter().map(|timeline| timeline.date).collect();
        assert_eq!(dates, vec![date!(2026 - 10 - 05), date!(2026 - 10 - 12)]);
        for timeline in &history {
            assert_eq!(timeline.mode, TemporalMode::Past);
            assert_eq!(timeline.slots[9].rule, ResolutionRule::StoredAggregate);
        }
        assert_eq!(history[1].slots[9].resolved_occupancy, Some(80.0));
        Ok(())
    }
}
