//! Engagement features: check-in habit and chat activity

use crate::features::types::EngagementFeatures;
use crate::features::window::{ratio, FeatureWindow};
use crate::types::BehavioralPattern;
use chrono::NaiveDate;

pub fn extract(window: &FeatureWindow<'_>) -> EngagementFeatures {
    let checkins_long = count_checkins(&window.long);
    let checkins_short = count_checkins(&window.short);
    let streaks = compute_streaks(&window.long, window.today);

    let chat_message_count_30d: u32 = window.long.iter().map(|p| p.chat_message_count).sum();
    let chat_session_count_30d = window
        .long
        .iter()
        .filter(|p| p.chat_message_count > 0)
        .count() as u32;

    let characters: u64 = window.long.iter().map(|p| p.chat_characters).sum();
    let rows: u32 = window.long.iter().map(|p| p.chat_rows).sum();

    EngagementFeatures {
        checkin_completion_rate_30d: ratio(checkins_long as f64, f64::from(window.long_days)),
        checkin_completion_rate_7d: ratio(checkins_short as f64, f64::from(window.short_days)),
        current_streak: streaks.current,
        longest_streak: streaks.longest,
        streak_break_count: count_streak_breaks(&window.long_chronological()),
        chat_message_count_30d,
        chat_session_count_30d,
        avg_chat_message_length: ratio(characters as f64, f64::from(rows)),
    }
}

fn count_checkins(patterns: &[&BehavioralPattern]) -> usize {
    patterns.iter().filter(|p| p.daily_checkin_completed).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Runs of consecutive check-in dates
///
/// `current` is the run containing the most recent check-in, and lapses to 0
/// once that check-in is more than one day before `today`.
pub(crate) fn compute_streaks(patterns: &[&BehavioralPattern], today: NaiveDate) -> Streaks {
    let mut dates: Vec<NaiveDate> = patterns
        .iter()
        .filter(|p| p.daily_checkin_completed)
        .map(|p| p.pattern_date)
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();

    let Some(&latest) = dates.first() else {
        return Streaks { current: 0, longest: 0 };
    };

    let mut longest = 1;
    let mut run = 1;
    let mut latest_run = None;
    for pair in dates.windows(2) {
        if (pair[0] - pair[1]).num_days() == 1 {
            run += 1;
        } else {
            latest_run.get_or_insert(run);
            run = 1;
        }
        longest = longest.max(run);
    }
    let latest_run = latest_run.unwrap_or(run);

    let current = if (today - latest).num_days() <= 1 {
        latest_run
    } else {
        0
    };

    Streaks { current, longest }
}

/// A break is a completed day followed, after a gap of more than one day, by a
/// day without a check-in
fn count_streak_breaks(chronological: &[&BehavioralPattern]) -> u32 {
    chronological
        .windows(2)
        .filter(|pair| {
            let gap = (pair[1].pattern_date - pair[0].pattern_date).num_days();
            gap > 1 && pair[0].daily_checkin_completed && !pair[1].daily_checkin_completed
        })
        .count() as u32
}
