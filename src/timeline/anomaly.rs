//! Congestion windows: contiguous runs of high historical occupancy.

use crate::timeline::{DayProfile, HighOccupancyWindow};

pub const HIGH_OCCUPANCY_THRESHOLD: f64 = 90.0;

pub fn detect_windows(profile: &DayProfile) -> Vec<HighOccupancyWindow> {
    detect_windows_with_threshold(&profile.hourly_averages, HIGH_OCCUPANCY_THRESHOLD)
}

/// Scans hours in order and emits one window per maximal run of
/// `averages[h] >= threshold`. Separate runs are never merged.
pub fn detect_windows_with_threshold(averages: &[f64], threshold: f64) -> Vec<HighOccupancyWindow> {
    let mut windows = Vec::new();
    let mut run_start: Option<u8> = None;

    for (hour, average) in averages.iter().enumerate() {
        let hour = hour as u8;
        if *average >= threshold {
            run_start.get_or_insert(hour);
        } else if let Some(start_hour) = run_start.take() {
            windows.push(HighOccupancyWindow {
                start_hour,
                end_hour: hour - 1,
            });
        }
    }

    if let Some(start_hour) = run_start {
        windows.push(HighOccupancyWindow {
            start_hour,
            end_hour: (averages.len() - 1) as u8,
        });
    }

    windows
}
