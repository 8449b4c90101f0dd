//! Core data types for Learner Flux
//!
//! This module defines the raw activity records read from the relational store
//! and the per-day behavioral pattern they are folded into.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of lifecycle events producers may record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CheckinCompleted,
    CheckinSkipped,
    ArkCreated,
    ArkCompleted,
    ArkPaused,
    MilestoneStarted,
    MilestoneCompleted,
    ChatMessageSent,
    ChatSessionStarted,
    ResourceViewed,
    ResourceCompleted,
    InterventionCreated,
    InterventionAcknowledged,
    XpEarned,
    BadgeEarned,
    StreakBroken,
    StreakContinued,
    GoalSet,
    GoalAchieved,
    PeerMatchViewed,
    StudySessionStarted,
    StudySessionEnded,
    DoubtAsked,
    DoubtResolved,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CheckinCompleted => "checkin_completed",
            EventType::CheckinSkipped => "checkin_skipped",
            EventType::ArkCreated => "ark_created",
            EventType::ArkCompleted => "ark_completed",
            EventType::ArkPaused => "ark_paused",
            EventType::MilestoneStarted => "milestone_started",
            EventType::MilestoneCompleted => "milestone_completed",
            EventType::ChatMessageSent => "chat_message_sent",
            EventType::ChatSessionStarted => "chat_session_started",
            EventType::ResourceViewed => "resource_viewed",
            EventType::ResourceCompleted => "resource_completed",
            EventType::InterventionCreated => "intervention_created",
            EventType::InterventionAcknowledged => "intervention_acknowledged",
            EventType::XpEarned => "xp_earned",
            EventType::BadgeEarned => "badge_earned",
            EventType::StreakBroken => "streak_broken",
            EventType::StreakContinued => "streak_continued",
            EventType::GoalSet => "goal_set",
            EventType::GoalAchieved => "goal_achieved",
            EventType::PeerMatchViewed => "peer_match_viewed",
            EventType::StudySessionStarted => "study_session_started",
            EventType::StudySessionEnded => "study_session_ended",
            EventType::DoubtAsked => "doubt_asked",
            EventType::DoubtResolved => "doubt_resolved",
        }
    }
}

/// Event payload, tagged by event type.
///
/// Serialized adjacently as `{"event_type": "...", "metadata": {...}}`.
/// [`Event`] flattens it, so a stored event row carries `event_type` and
/// `metadata` beside its own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "metadata", rename_all = "snake_case")]
pub enum EventPayload {
    CheckinCompleted {
        #[serde(default)]
        checkin_id: Option<String>,
    },
    CheckinSkipped,
    ArkCreated {
        ark_id: String,
    },
    ArkCompleted {
        ark_id: String,
    },
    ArkPaused {
        ark_id: String,
    },
    MilestoneStarted {
        milestone_id: String,
    },
    MilestoneCompleted {
        milestone_id: String,
        #[serde(default)]
        ark_id: Option<String>,
    },
    ChatMessageSent {
        #[serde(default)]
        session_id: Option<String>,
        /// Message length in characters, when the producer reports it
        #[serde(default)]
        length: Option<u32>,
    },
    ChatSessionStarted {
        session_id: String,
    },
    ResourceViewed {
        resource_id: String,
    },
    ResourceCompleted {
        resource_id: String,
    },
    InterventionCreated {
        #[serde(default)]
        intervention_id: Option<String>,
    },
    InterventionAcknowledged {
        #[serde(default)]
        intervention_id: Option<String>,
    },
    XpEarned {
        #[serde(default)]
        amount: i64,
        #[serde(default)]
        source: Option<String>,
    },
    BadgeEarned {
        badge_id: String,
    },
    StreakBroken {
        #[serde(default)]
        previous_length: u32,
    },
    StreakContinued {
        #[serde(default)]
        length: u32,
    },
    GoalSet {
        goal_id: String,
    },
    GoalAchieved {
        goal_id: String,
    },
    PeerMatchViewed {
        match_id: String,
    },
    StudySessionStarted {
        session_id: String,
    },
    StudySessionEnded {
        session_id: String,
        #[serde(default)]
        duration_minutes: Option<f64>,
    },
    DoubtAsked {
        doubt_id: String,
    },
    DoubtResolved {
        doubt_id: String,
    },
}

impl EventPayload {
    /// The event type this payload belongs to
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::CheckinCompleted { .. } => EventType::CheckinCompleted,
            EventPayload::CheckinSkipped => EventType::CheckinSkipped,
            EventPayload::ArkCreated { .. } => EventType::ArkCreated,
            EventPayload::ArkCompleted { .. } => EventType::ArkCompleted,
            EventPayload::ArkPaused { .. } => EventType::ArkPaused,
            EventPayload::MilestoneStarted { .. } => EventType::MilestoneStarted,
            EventPayload::MilestoneCompleted { .. } => EventType::MilestoneCompleted,
            EventPayload::ChatMessageSent { .. } => EventType::ChatMessageSent,
            EventPayload::ChatSessionStarted { .. } => EventType::ChatSessionStarted,
            EventPayload::ResourceViewed { .. } => EventType::ResourceViewed,
            EventPayload::ResourceCompleted { .. } => EventType::ResourceCompleted,
            EventPayload::InterventionCreated { .. } => EventType::InterventionCreated,
            EventPayload::InterventionAcknowledged { .. } => EventType::InterventionAcknowledged,
            EventPayload::XpEarned { .. } => EventType::XpEarned,
            EventPayload::BadgeEarned { .. } => EventType::BadgeEarned,
            EventPayload::StreakBroken { .. } => EventType::StreakBroken,
            EventPayload::StreakContinued { .. } => EventType::StreakContinued,
            EventPayload::GoalSet { .. } => EventType::GoalSet,
            EventPayload::GoalAchieved { .. } => EventType::GoalAchieved,
            EventPayload::PeerMatchViewed { .. } => EventType::PeerMatchViewed,
            EventPayload::StudySessionStarted { .. } => EventType::StudySessionStarted,
            EventPayload::StudySessionEnded { .. } => EventType::StudySessionEnded,
            EventPayload::DoubtAsked { .. } => EventType::DoubtAsked,
            EventPayload::DoubtResolved { .. } => EventType::DoubtResolved,
        }
    }
}

/// One entry of the append-only event log, stored as
/// `{"id", "student_id", "event_type", "metadata", "timestamp"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: Uuid,
    /// Subject of the event
    pub student_id: String,
    /// Type tag plus typed metadata
    #[serde(flatten)]
    pub payload: EventPayload,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event with a fresh identifier
    pub fn new(
        student_id: impl Into<String>,
        payload: EventPayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: student_id.into(),
            payload,
            timestamp,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

/// Emotion labels recognized on daily check-ins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Happy,
    Excited,
    Calm,
    Neutral,
    Sad,
    Anxious,
    Stressed,
    Angry,
    Frustrated,
}

impl Emotion {
    /// Parse an exact, lowercase check-in label
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "happy" => Some(Emotion::Happy),
            "excited" => Some(Emotion::Excited),
            "calm" => Some(Emotion::Calm),
            "neutral" => Some(Emotion::Neutral),
            "sad" => Some(Emotion::Sad),
            "anxious" => Some(Emotion::Anxious),
            "stressed" => Some(Emotion::Stressed),
            "angry" => Some(Emotion::Angry),
            "frustrated" => Some(Emotion::Frustrated),
            _ => None,
        }
    }

    /// Numeric valence on a 0-1 scale
    pub fn score(&self) -> f64 {
        match self {
            Emotion::Happy => 0.8,
            Emotion::Excited => 0.9,
            Emotion::Calm => 0.6,
            Emotion::Neutral => 0.5,
            Emotion::Sad => 0.2,
            Emotion::Anxious => 0.3,
            Emotion::Stressed => 0.2,
            Emotion::Angry => 0.1,
            Emotion::Frustrated => 0.2,
        }
    }

    /// Whether this emotion marks a high-stress day
    pub fn is_high_stress(&self) -> bool {
        matches!(self, Emotion::Stressed | Emotion::Anxious)
    }
}

/// A completed daily check-in row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub student_id: String,
    /// Calendar date the check-in belongs to
    pub date: NaiveDate,
    /// Free-text emotion label as entered by the student
    pub emotion: String,
    /// Energy level (0-5)
    pub energy: f64,
    /// Self-reported progress rating, if asked that day
    #[serde(default)]
    pub progress_rating: Option<f64>,
    /// Submission time, when recorded
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// ARK lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArkStatus {
    Active,
    Completed,
    Paused,
    #[serde(other)]
    Other,
}

/// A personalized learning roadmap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ark {
    pub id: String,
    pub student_id: String,
    pub status: ArkStatus,
    /// Overall progress percentage (0-100)
    #[serde(default)]
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time ARK progress reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArkProgressSnapshot {
    pub ark_id: String,
    pub student_id: String,
    /// Progress percentage (0-100) at `recorded_at`
    pub progress: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A milestone inside an ARK
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub ark_id: String,
    #[serde(default)]
    pub completed: bool,
}

/// A chat message sent by the student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub session_id: String,
    pub student_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// XP ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpTransaction {
    pub student_id: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Gamification stats row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentStats {
    pub student_id: String,
    pub level: u32,
}

/// Mentor intervention raised for a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: String,
    pub student_id: String,
    pub created_at: DateTime<Utc>,
}

/// Peer match offered to a student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMatch {
    pub student_id: String,
    pub matched_student_id: String,
    pub created_at: DateTime<Utc>,
}

/// Answers captured during onboarding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingProfile {
    /// Motivation (1-10)
    pub motivation_level: Option<f64>,
    /// Confidence (1-10)
    pub confidence_level: Option<f64>,
    /// Stress (1-10)
    pub stress_level: Option<f64>,
    pub interests: Vec<String>,
    pub goals: Vec<String>,
}

/// Student profile as owned by the onboarding subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub student_id: String,
    /// School grade as entered ("10", "12th", ...)
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub onboarding_profile: Option<OnboardingProfile>,
    #[serde(default)]
    pub onboarding_completed_at: Option<DateTime<Utc>>,
}

/// One day of aggregated activity for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralPattern {
    pub student_id: String,
    pub pattern_date: NaiveDate,

    // Raw daily facts
    pub daily_checkin_completed: bool,
    pub chat_message_count: u32,
    /// Summed ARK progress change that day (percentage points, may be negative)
    pub ark_progress_delta: f64,
    /// Energy level (0-5)
    pub avg_energy_level: f64,
    /// Emotion valence (0-1)
    pub avg_emotion_score: f64,
    pub avg_progress_rating: f64,
    pub milestone_completed_count: u32,
    pub xp_earned: i64,
    pub intervention_count: u32,
    /// 1 when the check-in reported a stressed or anxious state
    pub high_stress_days: u32,
    /// 1 when ARK progress went backwards that day
    pub declining_progress_days: u32,

    // Derived at aggregation time
    /// Daily engagement (0-100)
    pub engagement_score: f64,
    /// Daily wellbeing (0-100)
    pub wellbeing_score: f64,
    /// Daily performance (0-100)
    pub performance_score: f64,
    /// Consecutive days without a check-in, ending at this date
    pub missed_checkin_streak: u32,

    // Activity detail feeding extractor fields that need more than counts
    /// Total characters across raw chat message rows
    #[serde(default)]
    pub chat_characters: u64,
    /// Number of raw chat message rows (excludes event-log chat events)
    #[serde(default)]
    pub chat_rows: u32,
    /// Minutes spent in study sessions that ended this day
    #[serde(default)]
    pub study_minutes: f64,
    /// Timestamped activity per UTC hour of day
    #[serde(default)]
    pub hourly_activity: [u32; 24],
}

impl BehavioralPattern {
    /// All-zero pattern for a date
    pub fn empty(student_id: impl Into<String>, pattern_date: NaiveDate) -> Self {
        Self {
            student_id: student_id.into(),
            pattern_date,
            daily_checkin_completed: false,
            chat_message_count: 0,
            ark_progress_delta: 0.0,
            avg_energy_level: 0.0,
            avg_emotion_score: 0.0,
            avg_progress_rating: 0.0,
            milestone_completed_count: 0,
            xp_earned: 0,
            intervention_count: 0,
            high_stress_days: 0,
            declining_progress_days: 0,
            engagement_score: 0.0,
            wellbeing_score: 0.0,
            performance_score: 0.0,
            missed_checkin_streak: 0,
            chat_characters: 0,
            chat_rows: 0,
            study_minutes: 0.0,
            hourly_activity: [0; 24],
        }
    }

    /// Active = checked in, chatted, or made ARK progress
    pub fn is_active(&self) -> bool {
        self.daily_checkin_completed || self.chat_message_count > 0 || self.ark_progress_delta > 0.0
    }

    /// Count one timestamped activity in the hour histogram
    pub fn record_activity_at(&mut self, at: DateTime<Utc>) {
        self.hourly_activity[at.hour() as usize] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_payload_serialization() {
        let payload = EventPayload::XpEarned {
            amount: 50,
            source: Some("milestone".to_string()),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event_type"], "xp_earned");
        assert_eq!(json["metadata"]["amount"], 50);

        let parsed: EventPayload = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_event_row_shape() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let event = Event::new(
            "stu-1",
            EventPayload::XpEarned {
                amount: 50,
                source: None,
            },
            at,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["student_id"], "stu-1");
        assert_eq!(json["event_type"], "xp_earned");
        assert_eq!(json["metadata"]["amount"], 50);
        assert!(json.get("payload").is_none());

        let parsed: Event = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, event);

        let row = r#"{
            "id": "7f1d3b1c-2a44-4c55-9d0e-3f6a1b2c4d5e",
            "student_id": "stu-2",
            "event_type": "checkin_skipped",
            "timestamp": "2024-06-02T08:00:00Z"
        }"#;
        let parsed: Event = serde_json::from_str(row).unwrap();
        assert_eq!(parsed.event_type(), EventType::CheckinSkipped);
    }

    #[test]
    fn test_unit_payload_without_metadata() {
        let parsed: EventPayload =
            serde_json::from_str(r#"{"event_type": "checkin_skipped"}"#).unwrap();
        assert_eq!(parsed, EventPayload::CheckinSkipped);
    }

    #[test]
    fn test_xp_amount_defaults_to_zero() {
        let parsed: EventPayload =
            serde_json::from_str(r#"{"event_type": "xp_earned", "metadata": {}}"#).unwrap();
        assert_eq!(parsed, EventPayload::XpEarned { amount: 0, source: None });
    }

    #[test]
    fn test_event_type_matches_serialized_tag() {
        let payload = EventPayload::StudySessionEnded {
            session_id: "s1".to_string(),
            duration_minutes: Some(45.0),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event_type"], payload.event_type().as_str());
    }

    #[test]
    fn test_emotion_labels_are_case_sensitive() {
        assert_eq!(Emotion::from_label("happy"), Some(Emotion::Happy));
        assert_eq!(Emotion::from_label("Happy"), None);
        assert_eq!(Emotion::from_label("HAPPY"), None);
        assert_eq!(Emotion::from_label("bored"), None);
    }

    #[test]
    fn test_unknown_ark_status_deserializes_as_other() {
        let json = r#"{
            "id": "ark-1",
            "student_id": "stu-1",
            "status": "archived",
            "created_at": "2024-01-15T14:00:00Z"
        }"#;
        let ark: Ark = serde_json::from_str(json).unwrap();
        assert_eq!(ark.status, ArkStatus::Other);
        assert_eq!(ark.progress, 0.0);
    }

    #[test]
    fn test_pattern_activity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut pattern = BehavioralPattern::empty("stu-1", date);
        assert!(!pattern.is_active());

        pattern.ark_progress_delta = -5.0;
        assert!(!pattern.is_active());

        pattern.chat_message_count = 1;
        assert!(pattern.is_active());

        pattern.record_activity_at(Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
        assert_eq!(pattern.hourly_activity[14], 1);
    }
}
