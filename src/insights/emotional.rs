//! Emotional pattern over a recent window

use crate::features::{mean, population_std_dev};
use crate::insights::Trend;
use crate::types::BehavioralPattern;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalPattern {
    /// Mean emotion score over days that reported one (0-1)
    pub avg_score: f64,
    pub volatility: f64,
    pub trend: Trend,
    pub stress_days: u32,
    pub low_energy_days: u32,
    /// `max(0, 1 - 2 * volatility)`
    pub emotional_stability: f64,
}

pub fn emotional_pattern(patterns: &[BehavioralPattern], days: u32) -> EmotionalPattern {
    let window = &patterns[..patterns.len().min(days as usize)];

    let scores = reported_scores(window);
    let volatility = population_std_dev(&scores);

    let (later, earlier) = window.split_at(window.len() / 2);
    let (later, earlier) = (reported_scores(later), reported_scores(earlier));
    let trend = if later.is_empty() || earlier.is_empty() {
        Trend::Stable
    } else {
        Trend::from_change(mean(&later) - mean(&earlier))
    };

    EmotionalPattern {
        avg_score: mean(&scores),
        volatility,
        trend,
        stress_days: window.iter().filter(|p| p.high_stress_days > 0).count() as u32,
        low_energy_days: window
            .iter()
            .filter(|p| p.daily_checkin_completed && p.avg_energy_level < 2.0)
            .count() as u32,
        emotional_stability: (1.0 - 2.0 * volatility).max(0.0),
    }
}

/// Emotion scores of days that carry one
fn reported_scores(patterns: &[BehavioralPattern]) -> Vec<f64> {
    patterns
        .iter()
        .map(|p| p.avg_emotion_score)
        .filter(|s| *s > 0.0)
        .collect()
}
