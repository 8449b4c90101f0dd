//! Feature vector types
//!
//! The shape of [`FeatureSet`] is pinned by the field list of
//! [`FeatureVersion::CURRENT`]; changing a field here without registering a
//! new version fails the schema registry test.

use crate::schema::FeatureVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extraction snapshot for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLFeatureVector {
    pub student_id: String,
    /// Extraction time
    pub timestamp: DateTime<Utc>,
    pub features: FeatureSet,
    pub metadata: FeatureMetadata,
}

/// Storage key material carried with every vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    pub feature_version: FeatureVersion,
    pub extraction_timestamp: DateTime<Utc>,
}

/// The six feature domains
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub engagement: EngagementFeatures,
    pub emotional: EmotionalFeatures,
    pub performance: PerformanceFeatures,
    pub behavioral: BehavioralFeatures,
    pub profile: ProfileFeatures,
    pub social: SocialFeatures,
}

/// Check-in habit and chat activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementFeatures {
    pub checkin_completion_rate_30d: f64,
    pub checkin_completion_rate_7d: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub streak_break_count: u32,
    pub chat_message_count_30d: u32,
    /// Distinct days with chat activity
    pub chat_session_count_30d: u32,
    /// Mean characters per raw chat message
    pub avg_chat_message_length: f64,
}

/// Mood and energy reported on check-ins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalFeatures {
    pub avg_emotion_score_30d: f64,
    pub avg_emotion_score_7d: f64,
    /// Population standard deviation of daily emotion scores
    pub emotion_volatility: f64,
    pub avg_energy_level_30d: f64,
    pub avg_energy_level_7d: f64,
    pub stress_days_count_30d: u32,
    pub low_energy_days_count_30d: u32,
    /// Positive when recent mood is above the earlier baseline
    pub emotion_trend: f64,
}

/// ARK progress, milestones and XP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceFeatures {
    pub ark_progress_rate_30d: f64,
    pub ark_progress_rate_7d: f64,
    pub completed_arks_count: u32,
    pub active_arks_count: u32,
    pub milestone_completion_rate: f64,
    pub xp_earned_30d: i64,
    pub xp_earned_7d: i64,
    /// XP per day over the long window
    pub xp_earning_rate: f64,
    pub level: u32,
    pub progress_decline_days_30d: u32,
}

impl Default for PerformanceFeatures {
    fn default() -> Self {
        Self {
            ark_progress_rate_30d: 0.0,
            ark_progress_rate_7d: 0.0,
            completed_arks_count: 0,
            active_arks_count: 0,
            milestone_completion_rate: 0.0,
            xp_earned_30d: 0,
            xp_earned_7d: 0,
            xp_earning_rate: 0.0,
            level: 1,
            progress_decline_days_30d: 0,
        }
    }
}

/// Activity rhythm and habit strength
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralFeatures {
    pub consistency_score: f64,
    pub activity_days_count_30d: u32,
    pub activity_days_count_7d: u32,
    /// Study hours per active day; `None` when no session durations were recorded
    pub avg_daily_activity_time: Option<f64>,
    /// UTC hour with the most timestamped activity; `None` without timestamps
    pub peak_activity_hour: Option<u8>,
    pub weekend_activity_ratio: f64,
    pub behavioral_change_score: f64,
}

/// Static profile and onboarding answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFeatures {
    pub grade_level: u32,
    pub motivation_level: f64,
    pub confidence_level: f64,
    pub stress_level: f64,
    pub has_onboarding: bool,
    pub days_since_onboarding: u32,
    pub interests_count: u32,
    pub goals_count: u32,
}

pub(crate) const DEFAULT_GRADE_LEVEL: u32 = 10;
pub(crate) const DEFAULT_MOTIVATION_LEVEL: f64 = 7.0;
pub(crate) const DEFAULT_CONFIDENCE_LEVEL: f64 = 6.0;
pub(crate) const DEFAULT_STRESS_LEVEL: f64 = 5.0;

impl Default for ProfileFeatures {
    fn default() -> Self {
        Self {
            grade_level: DEFAULT_GRADE_LEVEL,
            motivation_level: DEFAULT_MOTIVATION_LEVEL,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            stress_level: DEFAULT_STRESS_LEVEL,
            has_onboarding: false,
            days_since_onboarding: 0,
            interests_count: 0,
            goals_count: 0,
        }
    }
}

/// Mentor interventions and peer matching
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialFeatures {
    pub intervention_count_30d: u32,
    pub peer_match_count: u32,
    pub social_engagement_score: f64,
}
