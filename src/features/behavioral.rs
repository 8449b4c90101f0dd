//! Behavioral features: activity rhythm and habit strength

use crate::features::types::BehavioralFeatures;
use crate::features::window::{ratio, FeatureWindow};
use crate::types::BehavioralPattern;
use chrono::{Datelike, Weekday};

pub fn extract(window: &FeatureWindow<'_>) -> BehavioralFeatures {
    let active_long = count_active(&window.long);

    BehavioralFeatures {
        consistency_score: ratio(active_long as f64, f64::from(window.long_days)),
        activity_days_count_30d: active_long,
        activity_days_count_7d: count_active(&window.short),
        avg_daily_activity_time: avg_daily_activity_hours(&window.long),
        peak_activity_hour: peak_activity_hour(&window.long),
        weekend_activity_ratio: weekend_activity_ratio(&window.long),
        behavioral_change_score: behavioral_change_score(&window.long_chronological()),
    }
}

fn count_active(patterns: &[&BehavioralPattern]) -> u32 {
    patterns.iter().filter(|p| p.is_active()).count() as u32
}

/// Hour with the largest summed activity count; earliest hour wins ties
fn peak_activity_hour(patterns: &[&BehavioralPattern]) -> Option<u8> {
    let mut histogram = [0u64; 24];
    for p in patterns {
        for (hour, count) in p.hourly_activity.iter().enumerate() {
            histogram[hour] += u64::from(*count);
        }
    }

    let mut peak: Option<(usize, u64)> = None;
    for (hour, &count) in histogram.iter().enumerate() {
        if count > 0 && peak.map_or(true, |(_, best)| count > best) {
            peak = Some((hour, count));
        }
    }
    peak.map(|(hour, _)| hour as u8)
}

/// Study hours per active day
fn avg_daily_activity_hours(patterns: &[&BehavioralPattern]) -> Option<f64> {
    let minutes: f64 = patterns.iter().map(|p| p.study_minutes).sum();
    if minutes <= 0.0 {
        return None;
    }
    let active = count_active(patterns).max(1);
    Some(minutes / 60.0 / f64::from(active))
}

/// Share of weekend days in the window that carry a check-in
fn weekend_activity_ratio(patterns: &[&BehavioralPattern]) -> f64 {
    let weekend: Vec<&&BehavioralPattern> = patterns
        .iter()
        .filter(|p| matches!(p.pattern_date.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();
    let checked_in = weekend.iter().filter(|p| p.daily_checkin_completed).count();
    ratio(checked_in as f64, weekend.len() as f64)
}

/// Active days in the later half minus the earlier half, over the earlier half's length
fn behavioral_change_score(chronological: &[&BehavioralPattern]) -> f64 {
    let (earlier, later) = chronological.split_at(chronological.len() / 2);
    if earlier.is_empty() {
        return 0.0;
    }
    let delta = f64::from(count_active(later)) - f64::from(count_active(earlier));
    delta / earlier.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureWindows;
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        // A Wednesday
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn on(date: NaiveDate) -> BehavioralPattern {
        BehavioralPattern::empty("stu-1", date)
    }

    fn split(patterns: &[BehavioralPattern]) -> FeatureWindow<'_> {
        FeatureWindow::split(patterns, FeatureWindows { long_days: 30, short_days: 7 }, now())
    }

    #[test]
    fn test_peak_hour_from_histogram() {
        let today = now().date_naive();
        let mut a = on(today);
        a.hourly_activity[9] = 2;
        a.hourly_activity[20] = 3;
        let mut b = on(today - Duration::days(1));
        b.hourly_activity[9] = 2;

        let features = extract(&split(&[a, b]));
        assert_eq!(features.peak_activity_hour, Some(9));
    }

    #[test]
    fn test_peak_hour_tie_prefers_earliest() {
        let mut a = on(now().date_naive());
        a.hourly_activity[15] = 1;
        a.hourly_activity[8] = 1;
        assert_eq!(extract(&split(&[a])).peak_activity_hour, Some(8));
    }

    #[test]
    fn test_unknowns_without_timestamps_or_sessions() {
        let mut a = on(now().date_naive());
        a.daily_checkin_completed = true;
        let features = extract(&split(&[a]));
        assert_eq!(features.peak_activity_hour, None);
        assert_eq!(features.avg_daily_activity_time, None);
    }

    #[test]
    fn test_study_time_per_active_day() {
        let today = now().date_naive();
        let mut a = on(today);
        a.daily_checkin_completed = true;
        a.study_minutes = 90.0;
        let mut b = on(today - Duration::days(1));
        b.chat_message_count = 1;
        b.study_minutes = 30.0;

        let features = extract(&split(&[a, b]));
        assert_eq!(features.avg_daily_activity_time, Some(1.0));
        assert_eq!(features.activity_days_count_7d, 2);
        assert!((features.consistency_score - 2.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekend_ratio() {
        let saturday = NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
        let mut sat = on(saturday);
        sat.daily_checkin_completed = true;
        let mut sun = on(sunday);
        sun.chat_message_count = 3;
        let mut monday = on(NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        monday.daily_checkin_completed = true;

        let features = extract(&split(&[sat, sun, monday]));
        assert!((features.weekend_activity_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_change_score_detects_acceleration() {
        let today = now().date_naive();
        let patterns: Vec<BehavioralPattern> = (0..4)
            .map(|offset| {
                let mut p = on(today - Duration::days(offset));
                // Only the two most recent days are active
                p.daily_checkin_completed = offset < 2;
                p
            })
            .collect();

        let features = extract(&split(&patterns));
        assert!((features.behavioral_change_score - 1.0).abs() < 1e-9);
    }
}
