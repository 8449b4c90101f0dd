//! Splitting a pattern history into the long and short feature windows.

use crate::schema::FeatureWindows;
use crate::types::BehavioralPattern;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Patterns that fall inside a schema's windows, newest first
#[derive(Debug, Clone)]
pub struct FeatureWindow<'a> {
    /// Reference calendar date (`now` in UTC)
    pub today: NaiveDate,
    pub long_days: u32,
    pub short_days: u32,
    pub long: Vec<&'a BehavioralPattern>,
    pub short: Vec<&'a BehavioralPattern>,
}

impl<'a> FeatureWindow<'a> {
    /// An N-day window holds the dates `d` with `today - N < d <= today`
    pub fn split(
        patterns: &'a [BehavioralPattern],
        windows: FeatureWindows,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let mut long: Vec<&BehavioralPattern> = patterns
            .iter()
            .filter(|p| in_window(p.pattern_date, today, windows.long_days))
            .collect();
        long.sort_by(|a, b| b.pattern_date.cmp(&a.pattern_date));

        let short = long
            .iter()
            .copied()
            .filter(|p| in_window(p.pattern_date, today, windows.short_days))
            .collect();

        Self {
            today,
            long_days: windows.long_days,
            short_days: windows.short_days,
            long,
            short,
        }
    }

    /// Long-window patterns oldest first
    pub fn long_chronological(&self) -> Vec<&'a BehavioralPattern> {
        self.long.iter().rev().copied().collect()
    }
}

fn in_window(date: NaiveDate, today: NaiveDate, days: u32) -> bool {
    date <= today && date > today - Duration::days(i64::from(days))
}

/// Arithmetic mean; 0 for an empty series
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0 for fewer than two values
pub(crate) fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// `numerator / denominator`, or 0 when the denominator is zero
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
