//! Feature schema versions
//!
//! Migration path: a change to any field of `FeatureSet` (added, removed, or
//! redefined) requires a new `FeatureVersion` variant with its own field list
//! and windows. Older variants stay in the registry so stored vectors remain
//! readable under their original version key; nothing converts vectors
//! between versions; consumers re-run extraction (or backfill) for the new one.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Released feature schema versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureVersion {
    #[default]
    #[serde(rename = "1.0.0")]
    V1_0_0,
}

/// Window lengths, in calendar days, a schema's features are computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureWindows {
    pub long_days: u32,
    pub short_days: u32,
}

const V1_0_0_FIELDS: &[&str] = &[
    "engagement.checkin_completion_rate_30d",
    "engagement.checkin_completion_rate_7d",
    "engagement.current_streak",
    "engagement.longest_streak",
    "engagement.streak_break_count",
    "engagement.chat_message_count_30d",
    "engagement.chat_session_count_30d",
    "engagement.avg_chat_message_length",
    "emotional.avg_emotion_score_30d",
    "emotional.avg_emotion_score_7d",
    "emotional.emotion_volatility",
    "emotional.avg_energy_level_30d",
    "emotional.avg_energy_level_7d",
    "emotional.stress_days_count_30d",
    "emotional.low_energy_days_count_30d",
    "emotional.emotion_trend",
    "performance.ark_progress_rate_30d",
    "performance.ark_progress_rate_7d",
    "performance.completed_arks_count",
    "performance.active_arks_count",
    "performance.milestone_completion_rate",
    "performance.xp_earned_30d",
    "performance.xp_earned_7d",
    "performance.xp_earning_rate",
    "performance.level",
    "performance.progress_decline_days_30d",
    "behavioral.consistency_score",
    "behavioral.activity_days_count_30d",
    "behavioral.activity_days_count_7d",
    "behavioral.avg_daily_activity_time",
    "behavioral.peak_activity_hour",
    "behavioral.weekend_activity_ratio",
    "behavioral.behavioral_change_score",
    "profile.grade_level",
    "profile.motivation_level",
    "profile.confidence_level",
    "profile.stress_level",
    "profile.has_onboarding",
    "profile.days_since_onboarding",
    "profile.interests_count",
    "profile.goals_count",
    "social.intervention_count_30d",
    "social.peer_match_count",
    "social.social_engagement_score",
];

impl FeatureVersion {
    /// Version produced by this build's extractor
    pub const CURRENT: FeatureVersion = FeatureVersion::V1_0_0;

    /// Every registered version, oldest first
    pub const ALL: &'static [FeatureVersion] = &[FeatureVersion::V1_0_0];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureVersion::V1_0_0 => "1.0.0",
        }
    }

    pub fn windows(&self) -> FeatureWindows {
        match self {
            FeatureVersion::V1_0_0 => FeatureWindows {
                long_days: 30,
                short_days: 7,
            },
        }
    }

    /// Dotted `domain.field` names of this version's schema, in schema order
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            FeatureVersion::V1_0_0 => V1_0_0_FIELDS,
        }
    }
}

impl fmt::Display for FeatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureVersion {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureVersion::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| PipelineError::UnsupportedFeatureVersion(s.to_string()))
    }
}
