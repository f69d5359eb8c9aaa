//! Groups a day's raw samples by hour of day.

use crate::timeline::{HOURS_PER_DAY, RawSample};
use tracing::debug;

/// Samples partitioned by the hour prefix of their timestamp, arrival order
/// preserved within each hour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourBuckets {
    buckets: [Vec<RawSample>; HOURS_PER_DAY],
}

impl HourBuckets {
    pub fn get(&self, hour: u8) -> &[RawSample] {
        self.buckets
            .get(hour as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

pub fn bucket_by_hour(samples: &[RawSample]) -> HourBuckets {
    let mut buckets = HourBuckets::default();
    for sample in samples {
        match sample_hour(&sample.timestamp) {
            Some(hour) => buckets.buckets[hour as usize].push(sample.clone()),
            None => debug!(
                timestamp = %sample.timestamp,
                "Dropping sample with unparseable hour"
            ),
        }
    }
    buckets
}

/// Hour of day from the two-digit prefix of `HH:MM[...]`.
pub fn sample_hour(timestamp: &str) -> Option<u8> {
    let prefix = timestamp.get(..2)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if timestamp.len() > 2 && !timestamp[2..].starts_with(':') {
        return None;
    }
    let hour: u8 = prefix.parse().ok()?;
    (hour < HOURS_PER_DAY as u8).then_some(hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_land_in_their_hour_in_arrival_order() {
        let samples = vec![
            RawSample::new("09:05", 40.0),
            RawSample::new("10:00", 55.0),
            RawSample::new("09:45", 42.0),
            RawSample::new("09:45", 44.0),
        ];

        let buckets = bucket_by_hour(&samples);

        assert_eq!(
            buckets.get(9),
            &[
                RawSample::new("09:05", 40.0),
                RawSample::new("09:45", 42.0),
                RawSample::new("09:45", 44.0),
            ]
        );
        assert_eq!(buckets.get(10), &[RawSample::new("10:00", 55.0)]);
        assert!(buckets.get(11).is_empty());
    }

    #[test]
    fn duplicate_timestamps_keep_last_arrival_as_latest() {
        let samples = vec![
            RawSample::new("14:30", 70.0),
            RawSample::new("14:30", 71.0),
        ];

        let buckets = bucket_by_hour(&samples);

        assert_eq!(buckets.get(14).last().map(|s| s.value), Some(71.0));
    }

    #[test]
    fn finer_timestamps_use_the_hour_prefix() {
        assert_eq!(sample_hour("23:59:59.999"), Some(23));
        assert_eq!(sample_hour("00:00"), Some(0));
        assert_eq!(sample_hour("07"), Some(7));
    }

    #[test]
    fn malformed_timestamps_are_dropped() {
        let samples = vec![
            RawSample::new("24:00", 10.0),
            RawSample::new("9:30", 10.0),
            RawSample::new("ab:cd", 10.0),
            RawSample::new("", 10.0),
            RawSample::new("123:00", 10.0),
        ];

        let buckets = bucket_by_hour(&samples);

        assert!(buckets.is_empty());
    }
}
