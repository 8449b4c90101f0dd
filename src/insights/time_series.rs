//! Time-series features for temporal models

use crate::features::{mean, population_std_dev, ratio};
use crate::types::BehavioralPattern;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesFeatures {
    pub trends: SeriesTrends,
    pub seasonality: Seasonality,
    pub volatility: SeriesVolatility,
    pub changes: RecentChanges,
}

/// Regression slope per day divided by 10, clamped to [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTrends {
    pub engagement_trend: f64,
    pub emotion_trend: f64,
    /// Trend of daily ARK progress deltas
    pub performance_trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    /// Active fraction per weekday, Sunday first
    pub weekly_pattern: [f64; 7],
    /// Active day count per weekday name
    pub activity_by_day: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesVolatility {
    pub engagement_volatility: f64,
    pub emotion_volatility: f64,
    pub performance_volatility: f64,
}

/// Mean engagement of the last N patterns minus the N before them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentChanges {
    pub recent_change_7d: f64,
    pub recent_change_14d: f64,
    pub recent_change_30d: f64,
}

pub fn time_series_features(patterns: &[BehavioralPattern]) -> TimeSeriesFeatures {
    let chronological: Vec<&BehavioralPattern> = patterns.iter().rev().collect();
    let engagement: Vec<f64> = chronological.iter().map(|p| p.engagement_score).collect();
    let emotion: Vec<f64> = chronological.iter().map(|p| p.avg_emotion_score).collect();
    let performance: Vec<f64> = chronological.iter().map(|p| p.ark_progress_delta).collect();

    TimeSeriesFeatures {
        trends: SeriesTrends {
            engagement_trend: compute_trend(&engagement),
            emotion_trend: compute_trend(&emotion),
            performance_trend: compute_trend(&performance),
        },
        seasonality: seasonality(patterns),
        volatility: SeriesVolatility {
            engagement_volatility: population_std_dev(&engagement),
            emotion_volatility: population_std_dev(&emotion),
            performance_volatility: population_std_dev(&performance),
        },
        changes: RecentChanges {
            recent_change_7d: recent_change(patterns, 7),
            recent_change_14d: recent_change(patterns, 14),
            recent_change_30d: recent_change(patterns, 30),
        },
    }
}

/// Least-squares slope over an evenly spaced series, scaled into [-1, 1]
fn compute_trend(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }
    let slope = ratio(n * sum_xy - sum_x * sum_y, n * sum_xx - sum_x * sum_x);
    (slope / 10.0).clamp(-1.0, 1.0)
}

/// A weekday counts as active with a check-in or chat activity
fn seasonality(patterns: &[BehavioralPattern]) -> Seasonality {
    let mut active = [0u32; 7];
    let mut seen = [0u32; 7];
    for p in patterns {
        let weekday = p.pattern_date.weekday().num_days_from_sunday() as usize;
        seen[weekday] += 1;
        if p.daily_checkin_completed || p.chat_message_count > 0 {
            active[weekday] += 1;
        }
    }

    let mut weekly_pattern = [0.0; 7];
    for (i, slot) in weekly_pattern.iter_mut().enumerate() {
        *slot = ratio(f64::from(active[i]), f64::from(seen[i]));
    }
    let activity_by_day = DAY_NAMES
        .iter()
        .zip(active)
        .map(|(name, count)| (name.to_string(), count))
        .collect();

    Seasonality {
        weekly_pattern,
        activity_by_day,
    }
}

fn recent_change(patterns: &[BehavioralPattern], days: usize) -> f64 {
    if patterns.len() < days * 2 {
        return 0.0;
    }
    let scores = |slice: &[BehavioralPattern]| -> Vec<f64> {
        slice.iter().map(|p| p.engagement_score).collect()
    };
    mean(&scores(&patterns[..days])) - mean(&scores(&patterns[days..days * 2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn history(days: i64, engagement: impl Fn(i64) -> f64) -> Vec<BehavioralPattern> {
        // 2024-04-28 is a Sunday
        let newest = NaiveDate::from_ymd_opt(2024, 4, 28).unwrap();
        (0..days)
            .map(|offset| {
                let mut p = BehavioralPattern::empty("stu-1", newest - Duration::days(offset));
                p.engagement_score = engagement(offset);
                p
            })
            .collect()
    }

    #[test]
    fn test_trend_slope() {
        assert_eq!(compute_trend(&[5.0]), 0.0);
        assert_eq!(compute_trend(&[3.0, 3.0, 3.0]), 0.0);
        assert!((compute_trend(&[0.0, 1.0, 2.0, 3.0]) - 0.1).abs() < 1e-9);
        assert_eq!(compute_trend(&[0.0, 50.0, 100.0]), 1.0);
    }

    #[test]
    fn test_engagement_trend_is_chronological() {
        // Engagement rises toward the newest day
        let patterns = history(10, |offset| 50.0 - offset as f64);
        let features = time_series_features(&patterns);
        assert!((features.trends.engagement_trend - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_recent_change() {
        let patterns = history(14, |offset| if offset < 7 { 60.0 } else { 40.0 });
        let features = time_series_features(&patterns);
        assert!((features.changes.recent_change_7d - 20.0).abs() < 1e-9);
        assert_eq!(features.changes.recent_change_14d, 0.0);
        assert_eq!(features.changes.recent_change_30d, 0.0);
    }

    #[test]
    fn test_weekly_pattern() {
        let mut patterns = history(14, |_| 0.0);
        // Both Sundays active, one Monday active
        patterns[0].daily_checkin_completed = true;
        patterns[7].chat_message_count = 2;
        patterns[6].daily_checkin_completed = true;

        let features = time_series_features(&patterns);
        assert_eq!(features.seasonality.weekly_pattern[0], 1.0);
        assert_eq!(features.seasonality.weekly_pattern[1], 0.5);
        assert_eq!(features.seasonality.weekly_pattern[3], 0.0);
        assert_eq!(features.seasonality.activity_by_day["Sunday"], 2);
        assert_eq!(features.seasonality.activity_by_day["Monday"], 1);
        assert_eq!(features.seasonality.activity_by_day.len(), 7);
    }
}
