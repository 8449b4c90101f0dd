//! Engagement metrics over a recent window

use crate::features::ratio;
use crate::insights::Trend;
use crate::types::BehavioralPattern;
use serde::{Deserialize, Serialize};

/// Chat messages per day that count as full chat activity
const CHAT_MESSAGES_PER_DAY: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Weighted engagement (0-100)
    pub overall_score: f64,
    pub checkin_rate: f64,
    pub chat_activity: f64,
    pub ark_progress: f64,
    pub consistency: f64,
    pub trend: Trend,
}

/// Engagement over the `days` most recent patterns
///
/// Formula:
/// ```text
/// overall = 100 * (0.3 * checkin_rate + 0.2 * chat_activity
///                + 0.3 * ark_progress + 0.2 * consistency)
/// ```
pub fn engagement_metrics(patterns: &[BehavioralPattern], days: u32) -> EngagementMetrics {
    let window = &patterns[..patterns.len().min(days as usize)];
    let days = f64::from(days);

    let checkin_rate = ratio(count_checkins(window), days);
    let chat_activity = chat_activity(window, days);
    let ark_progress = ark_progress(window, days);
    let consistency = ratio(window.iter().filter(|p| p.is_active()).count() as f64, days);

    let overall_score =
        100.0 * (0.3 * checkin_rate + 0.2 * chat_activity + 0.3 * ark_progress + 0.2 * consistency);

    // Newest first, so the later half comes first
    let (later, earlier) = window.split_at(window.len() / 2);
    let trend = if later.is_empty() || earlier.is_empty() {
        Trend::Stable
    } else {
        Trend::from_change(half_score(later) - half_score(earlier))
    };

    EngagementMetrics {
        overall_score,
        checkin_rate,
        chat_activity,
        ark_progress,
        consistency,
        trend,
    }
}

fn count_checkins(patterns: &[BehavioralPattern]) -> f64 {
    patterns.iter().filter(|p| p.daily_checkin_completed).count() as f64
}

fn chat_activity(patterns: &[BehavioralPattern], days: f64) -> f64 {
    let messages: u32 = patterns.iter().map(|p| p.chat_message_count).sum();
    ratio(f64::from(messages), days * CHAT_MESSAGES_PER_DAY).min(1.0)
}

/// Summed progress per day, capped at one percentage point per day
fn ark_progress(patterns: &[BehavioralPattern], days: f64) -> f64 {
    let progress: f64 = patterns.iter().map(|p| p.ark_progress_delta).sum();
    ratio(progress, days).clamp(0.0, 1.0)
}

fn half_score(half: &[BehavioralPattern]) -> f64 {
    let len = half.len() as f64;
    0.3 * ratio(count_checkins(half), len)
        + 0.2 * chat_activity(half, len)
        + 0.5 * ark_progress(half, len)
}
