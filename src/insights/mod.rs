//! Pattern insights
//!
//! Dashboard-oriented summaries computed directly from a student's recent
//! [`BehavioralPattern`](crate::types::BehavioralPattern) history. Inputs are
//! expected newest first, as returned by the aggregator.

mod emotional;
mod engagement;
mod time_series;

pub use emotional::{emotional_pattern, EmotionalPattern};
pub use engagement::{engagement_metrics, EngagementMetrics};
pub use time_series::{time_series_features, TimeSeriesFeatures};

use serde::{Deserialize, Serialize};

/// Minimum half-over-half change that counts as a trend
const TREND_THRESHOLD: f64 = 0.1;

/// Direction of change between the earlier and the later half of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

impl Trend {
    /// Classify `later - earlier`
    pub fn from_change(change: f64) -> Self {
        if change > TREND_THRESHOLD {
            Trend::Improving
        } else if change < -TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(Trend::from_change(0.25), Trend::Improving);
        assert_eq!(Trend::from_change(0.1), Trend::Stable);
        assert_eq!(Trend::from_change(-0.05), Trend::Stable);
        assert_eq!(Trend::from_change(-0.2), Trend::Declining);
    }
}
