//! Emotional features
//!
//! Mood and energy only exist on days with a check-in, so every statistic here
//! is taken over check-in days; a day without a check-in is missing data, not
//! a zero mood.

use crate::features::types::EmotionalFeatures;
use crate::features::window::{mean, population_std_dev, FeatureWindow};
use crate::types::BehavioralPattern;
use chrono::Duration;

/// Energy below this (0-5 scale) marks a low-energy day
const LOW_ENERGY_THRESHOLD: f64 = 2.0;

/// Minimum check-in days in the long window before a trend is reported
const MIN_TREND_DAYS: usize = 8;

pub fn extract(window: &FeatureWindow<'_>) -> EmotionalFeatures {
    let long = checkin_days(&window.long);
    let short = checkin_days(&window.short);

    let emotion_long: Vec<f64> = long.iter().map(|p| p.avg_emotion_score).collect();
    let emotion_short: Vec<f64> = short.iter().map(|p| p.avg_emotion_score).collect();
    let energy_long: Vec<f64> = long.iter().map(|p| p.avg_energy_level).collect();
    let energy_short: Vec<f64> = short.iter().map(|p| p.avg_energy_level).collect();

    let stress_days_count_30d = long.iter().filter(|p| p.high_stress_days > 0).count() as u32;
    let low_energy_days_count_30d = long
        .iter()
        .filter(|p| p.avg_energy_level < LOW_ENERGY_THRESHOLD)
        .count() as u32;

    EmotionalFeatures {
        avg_emotion_score_30d: mean(&emotion_long),
        avg_emotion_score_7d: mean(&emotion_short),
        emotion_volatility: population_std_dev(&emotion_long),
        avg_energy_level_30d: mean(&energy_long),
        avg_energy_level_7d: mean(&energy_short),
        stress_days_count_30d,
        low_energy_days_count_30d,
        emotion_trend: emotion_trend(window, &long),
    }
}

fn checkin_days<'a>(patterns: &[&'a BehavioralPattern]) -> Vec<&'a BehavioralPattern> {
    patterns
        .iter()
        .copied()
        .filter(|p| p.daily_checkin_completed)
        .collect()
}

/// Short-window mean minus the mean of the older long-window days
fn emotion_trend(window: &FeatureWindow<'_>, long: &[&BehavioralPattern]) -> f64 {
    if long.len() < MIN_TREND_DAYS {
        return 0.0;
    }

    let cutoff = window.today - Duration::days(i64::from(window.short_days));
    let (recent, earlier): (Vec<&BehavioralPattern>, Vec<&BehavioralPattern>) =
        long.iter().copied().partition(|p| p.pattern_date > cutoff);
    let recent: Vec<f64> = recent.iter().map(|p| p.avg_emotion_score).collect();
    let earlier: Vec<f64> = earlier.iter().map(|p| p.avg_emotion_score).collect();

    if recent.is_empty() || earlier.is_empty() {
        return 0.0;
    }
    mean(&recent) - mean(&earlier)
}
