//! Behavioral pattern aggregation
//!
//! Folds a student's raw check-ins, events, ARK progress snapshots and chat
//! messages for a date range into one [`BehavioralPattern`] per calendar date
//! touched by any source. Patterns are recomputed from scratch on every call.

use crate::features::{or_degraded, ratio};
use crate::store::ActivitySource;
use crate::tracker::EventTracker;
use crate::types::{
    ArkProgressSnapshot, BehavioralPattern, ChatMessage, CheckIn, Emotion, Event, EventPayload,
};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Longest range, in calendar days, that `aggregate_days` reads
pub const MAX_AGGREGATION_DAYS: u32 = 3650;

/// Score used for emotion labels outside the known set
pub const NEUTRAL_EMOTION_SCORE: f64 = 0.5;

/// Map a check-in emotion label to its 0-1 score
pub fn emotion_score(label: &str) -> f64 {
    Emotion::from_label(label).map_or(NEUTRAL_EMOTION_SCORE, |e| e.score())
}

/// Raw slices read for one aggregation
#[derive(Debug, Clone, Default)]
pub struct RawActivity {
    pub checkins: Vec<CheckIn>,
    pub events: Vec<Event>,
    pub ark_snapshots: Vec<ArkProgressSnapshot>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone)]
pub struct BehavioralAggregator {
    source: Arc<dyn ActivitySource>,
    tracker: EventTracker,
}

impl BehavioralAggregator {
    pub fn new(source: Arc<dyn ActivitySource>, tracker: EventTracker) -> Self {
        Self { source, tracker }
    }

    /// Aggregate the `days` calendar dates ending at `now`'s date.
    ///
    /// `days` is clamped to `1..=MAX_AGGREGATION_DAYS`.
    pub async fn aggregate_days(
        &self,
        student_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Vec<BehavioralPattern> {
        if days > MAX_AGGREGATION_DAYS {
            warn!(student_id, days, max = MAX_AGGREGATION_DAYS, "aggregation range clamped");
        }
        let span = u64::from(days.clamp(1, MAX_AGGREGATION_DAYS)) - 1;
        let first_date = now
            .date_naive()
            .checked_sub_days(Days::new(span))
            .unwrap_or(NaiveDate::MIN);
        let start = first_date.and_time(NaiveTime::MIN).and_utc();
        self.aggregate(student_id, start, now).await
    }

    /// Aggregate `[start, end]` into patterns sorted by date, newest first.
    ///
    /// Check-ins are selected by calendar date, every other source by
    /// timestamp. A failed read contributes nothing and is logged.
    pub async fn aggregate(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<BehavioralPattern> {
        let (checkins, events, ark_snapshots, messages) = tokio::join!(
            self.source
                .checkins(student_id, start.date_naive(), end.date_naive()),
            self.tracker.get_student_events(student_id, start, end),
            self.source.ark_progress(student_id, start, end),
            self.source.chat_messages(student_id, start, end),
        );

        let raw = RawActivity {
            checkins: or_degraded(checkins, student_id, "checkins"),
            events,
            ark_snapshots: or_degraded(ark_snapshots, student_id, "ark_progress"),
            messages: or_degraded(messages, student_id, "chat_messages"),
        };

        let patterns = fold_patterns(student_id, &raw, start.date_naive());
        debug!(
            student_id,
            checkins = raw.checkins.len(),
            events = raw.events.len(),
            ark_snapshots = raw.ark_snapshots.len(),
            messages = raw.messages.len(),
            patterns = patterns.len(),
            "aggregated behavioral patterns"
        );
        patterns
    }
}

/// Running per-date state while folding
struct DayAccumulator {
    pattern: BehavioralPattern,
    checkins: u32,
    emotion_sum: f64,
    energy_sum: f64,
    rating_sum: f64,
    ratings: u32,
    stressed: bool,
}

impl DayAccumulator {
    fn new(student_id: &str, date: NaiveDate) -> Self {
        Self {
            pattern: BehavioralPattern::empty(student_id, date),
            checkins: 0,
            emotion_sum: 0.0,
            energy_sum: 0.0,
            rating_sum: 0.0,
            ratings: 0,
            stressed: false,
        }
    }

    fn add_checkin(&mut self, checkin: &CheckIn) {
        self.checkins += 1;
        self.emotion_sum += emotion_score(&checkin.emotion);
        self.energy_sum += checkin.energy;
        if let Some(rating) = checkin.progress_rating {
            self.rating_sum += rating;
            self.ratings += 1;
        }
        if Emotion::from_label(&checkin.emotion).is_some_and(|e| e.is_high_stress()) {
            self.stressed = true;
        }
        if let Some(at) = checkin.created_at {
            self.pattern.record_activity_at(at);
        }
    }

    fn add_event(&mut self, event: &Event) {
        let p = &mut self.pattern;
        match &event.payload {
            EventPayload::ChatMessageSent { .. } => p.chat_message_count += 1,
            EventPayload::MilestoneCompleted { .. } => p.milestone_completed_count += 1,
            EventPayload::XpEarned { amount, .. } => p.xp_earned += amount,
            EventPayload::InterventionCreated { .. } => p.intervention_count += 1,
            EventPayload::StudySessionEnded {
                duration_minutes: Some(minutes),
                ..
            } if minutes.is_finite() && *minutes > 0.0 => p.study_minutes += minutes,
            _ => {}
        }
        p.record_activity_at(event.timestamp);
    }

    fn add_message(&mut self, message: &ChatMessage) {
        let p = &mut self.pattern;
        p.chat_message_count += 1;
        p.chat_rows += 1;
        p.chat_characters += message.content.chars().count() as u64;
        p.record_activity_at(message.timestamp);
    }

    fn finish(self) -> BehavioralPattern {
        let mut p = self.pattern;
        if self.checkins > 0 {
            let n = f64::from(self.checkins);
            p.daily_checkin_completed = true;
            p.avg_emotion_score = self.emotion_sum / n;
            p.avg_energy_level = self.energy_sum / n;
            p.avg_progress_rating = ratio(self.rating_sum, f64::from(self.ratings));
        }
        p.high_stress_days = u32::from(self.stressed);
        p.declining_progress_days = u32::from(p.ark_progress_delta < 0.0);
        p.engagement_score = compute_engagement_score(&p);
        p.wellbeing_score = compute_wellbeing_score(&p);
        p.performance_score = compute_performance_score(&p);
        p
    }
}

/// Fold raw activity into one pattern per touched date, newest first.
///
/// `missed_checkin_streak` counts days from `range_start`, the first date of
/// the requested range.
pub fn fold_patterns(
    student_id: &str,
    raw: &RawActivity,
    range_start: NaiveDate,
) -> Vec<BehavioralPattern> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for checkin in &raw.checkins {
        day_entry(&mut days, student_id, checkin.date).add_checkin(checkin);
    }
    for event in &raw.events {
        day_entry(&mut days, student_id, event.timestamp.date_naive()).add_event(event);
    }
    for message in &raw.messages {
        day_entry(&mut days, student_id, message.timestamp.date_naive()).add_message(message);
    }
    for (date, delta, at) in ark_progress_deltas(&raw.ark_snapshots) {
        let acc = day_entry(&mut days, student_id, date);
        acc.pattern.ark_progress_delta += delta;
        acc.pattern.record_activity_at(at);
    }

    let mut patterns: Vec<BehavioralPattern> =
        days.into_values().map(DayAccumulator::finish).collect();
    assign_missed_streaks(&mut patterns, range_start);
    patterns.reverse();
    patterns
}

fn day_entry<'a>(
    days: &'a mut BTreeMap<NaiveDate, DayAccumulator>,
    student_id: &str,
    date: NaiveDate,
) -> &'a mut DayAccumulator {
    days.entry(date)
        .or_insert_with(|| DayAccumulator::new(student_id, date))
}

/// Per-ARK progress changes as `(date, delta, recorded_at)`.
/// The first snapshot of each ARK carries a zero delta.
fn ark_progress_deltas(snapshots: &[ArkProgressSnapshot]) -> Vec<(NaiveDate, f64, DateTime<Utc>)> {
    let mut by_ark: HashMap<&str, Vec<&ArkProgressSnapshot>> = HashMap::new();
    for snapshot in snapshots {
        by_ark.entry(snapshot.ark_id.as_str()).or_default().push(snapshot);
    }

    let mut deltas = Vec::with_capacity(snapshots.len());
    for series in by_ark.values_mut() {
        series.sort_by_key(|s| s.recorded_at);
        let mut previous: Option<f64> = None;
        for snapshot in series.iter() {
            let delta = previous.map_or(0.0, |prev| snapshot.progress - prev);
            deltas.push((snapshot.recorded_at.date_naive(), delta, snapshot.recorded_at));
            previous = Some(snapshot.progress);
        }
    }
    deltas
}

/// Days since the last check-in, counted at pattern dates only.
///
/// Before the first check-in the count runs from the earlier of `range_start`
/// and the first pattern date. `patterns` must be oldest first.
fn assign_missed_streaks(patterns: &mut [BehavioralPattern], range_start: NaiveDate) {
    let Some(first) = patterns.first() else {
        return;
    };
    let walk_start = first.pattern_date.min(range_start);

    let mut last_checkin: Option<NaiveDate> = None;
    for p in patterns.iter_mut() {
        if p.daily_checkin_completed {
            last_checkin = Some(p.pattern_date);
            p.missed_checkin_streak = 0;
            continue;
        }
        let gap = match last_checkin {
            Some(day) => (p.pattern_date - day).num_days(),
            None => (p.pattern_date - walk_start).num_days() + 1,
        };
        p.missed_checkin_streak = u32::try_from(gap).unwrap_or(u32::MAX);
    }
}

/// Daily engagement (0-100)
///
/// Formula:
/// ```text
/// 30 if checked in
///   + min(chat_messages * 2, 20)
///   + min(ark_progress_delta * 10, 30)
///   + min(milestones_completed * 10, 20)
/// ```
pub fn compute_engagement_score(p: &BehavioralPattern) -> f64 {
    let checkin = if p.daily_checkin_completed { 30.0 } else { 0.0 };
    let chat = (f64::from(p.chat_message_count) * 2.0).min(20.0);
    let progress = (p.ark_progress_delta * 10.0).min(30.0);
    let milestones = (f64::from(p.milestone_completed_count) * 10.0).min(20.0);
    (checkin + chat + progress + milestones).clamp(0.0, 100.0)
}

/// Daily wellbeing (0-100): `100 * (0.6 * emotion + 0.4 * energy / 5)` on check-in days
pub fn compute_wellbeing_score(p: &BehavioralPattern) -> f64 {
    if !p.daily_checkin_completed {
        return 0.0;
    }
    let energy = (p.avg_energy_level / 5.0).clamp(0.0, 1.0);
    (100.0 * (0.6 * p.avg_emotion_score + 0.4 * energy)).clamp(0.0, 100.0)
}

/// Daily performance (0-100)
///
/// Formula: `min(delta * 10, 50) + min(milestones * 15, 30) + min(xp / 5, 20)`
pub fn compute_performance_score(p: &BehavioralPattern) -> f64 {
    let progress = (p.ark_progress_delta * 10.0).min(50.0);
    let milestones = (f64::from(p.milestone_completed_count) * 15.0).min(30.0);
    let xp = (p.xp_earned as f64 / 5.0).min(20.0);
    (progress + milestones + xp).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Dataset, MemoryStore};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, hour, 0, 0).unwrap()
    }

    fn checkin(d: u32, emotion: &str, energy: f64) -> CheckIn {
        CheckIn {
            student_id: "stu-1".to_string(),
            date: date(d),
            emotion: emotion.to_string(),
            energy,
            progress_rating: None,
            created_at: None,
        }
    }

    fn message(d: u32, hour: u32, content: &str) -> ChatMessage {
        ChatMessage {
            session_id: "s1".to_string(),
            student_id: "stu-1".to_string(),
            content: content.to_string(),
            timestamp: at(d, hour),
        }
    }

    fn snapshot(ark: &str, d: u32, progress: f64) -> ArkProgressSnapshot {
        ArkProgressSnapshot {
            ark_id: ark.to_string(),
            student_id: "stu-1".to_string(),
            progress,
            recorded_at: at(d, 12),
        }
    }

    #[test]
    fn test_emotion_mapping() {
        let expected = [
            ("happy", 0.8),
            ("excited", 0.9),
            ("calm", 0.6),
            ("neutral", 0.5),
            ("sad", 0.2),
            ("anxious", 0.3),
            ("stressed", 0.2),
            ("angry", 0.1),
            ("frustrated", 0.2),
        ];
        for (label, score) in expected {
            assert_eq!(emotion_score(label), score, "{}", label);
        }
        for label in ["Happy", "EXCITED", "bored", "", "  calm"] {
            assert_eq!(emotion_score(label), 0.5, "{}", label);
        }
    }

    #[test]
    fn test_engagement_score_bounds() {
        let mut p = BehavioralPattern::empty("stu-1", date(1));
        for checkin in [false, true] {
            for chat in [0, 1, 5, 50] {
                for delta in [-100.0, -1.0, 0.0, 0.5, 2.0, 1000.0] {
                    for milestones in [0, 1, 2, 40] {
                        p.daily_checkin_completed = checkin;
                        p.chat_message_count = chat;
                        p.ark_progress_delta = delta;
                        p.milestone_completed_count = milestones;
                        let score = compute_engagement_score(&p);
                        assert!((0.0..=100.0).contains(&score), "{:?}", p);
                    }
                }
            }
        }
        p.daily_checkin_completed = true;
        p.chat_message_count = 10;
        p.ark_progress_delta = 3.0;
        p.milestone_completed_count = 2;
        assert_eq!(compute_engagement_score(&p), 100.0);
    }

    #[test]
    fn test_engagement_score_monotonic() {
        let base = BehavioralPattern::empty("stu-1", date(1));
        let mut previous = compute_engagement_score(&base);
        for chat in 1..15 {
            let mut p = base.clone();
            p.chat_message_count = chat;
            let score = compute_engagement_score(&p);
            assert!(score >= previous);
            previous = score;
        }

        let mut previous = compute_engagement_score(&base);
        for step in 1..10 {
            let mut p = base.clone();
            p.ark_progress_delta = f64::from(step) * 0.5;
            p.milestone_completed_count = 1;
            let score = compute_engagement_score(&p);
            let mut without = p.clone();
            without.ark_progress_delta = f64::from(step - 1) * 0.5;
            assert!(score >= compute_engagement_score(&without));
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_one_pattern_per_touched_date() {
        let raw = RawActivity {
            checkins: vec![checkin(1, "happy", 4.0), checkin(3, "sad", 2.0)],
            events: vec![
                Event::new("stu-1", EventPayload::XpEarned { amount: 10, source: None }, at(3, 9)),
                Event::new(
                    "stu-1",
                    EventPayload::ChatMessageSent {
                        session_id: None,
                        length: None,
                    },
                    at(4, 10),
                ),
                Event::new(
                    "stu-1",
                    EventPayload::InterventionCreated {
                        intervention_id: None,
                    },
                    at(4, 11),
                ),
            ],
            ark_snapshots: vec![snapshot("a1", 5, 10.0)],
            messages: vec![message(1, 20, "hi"), message(6, 8, "hello")],
        };

        let patterns = fold_patterns("stu-1", &raw, date(1));
        let dates: Vec<NaiveDate> = patterns.iter().map(|p| p.pattern_date).collect();
        assert_eq!(dates, vec![date(6), date(5), date(4), date(3), date(1)]);

        let day4 = &patterns[2];
        assert!(!day4.daily_checkin_completed);
        assert_eq!(day4.chat_message_count, 1);
        assert_eq!(day4.intervention_count, 1);

        let day3 = &patterns[3];
        assert!(day3.daily_checkin_completed);
        assert_eq!(day3.xp_earned, 10);
        assert_eq!(day3.avg_emotion_score, 0.2);
        assert_eq!(day3.high_stress_days, 0);
    }

    #[test]
    fn test_checkin_only_day() {
        let raw = RawActivity {
            checkins: vec![checkin(2, "anxious", 3.0)],
            ..Default::default()
        };
        let patterns = fold_patterns("stu-1", &raw, date(2));
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert!(p.daily_checkin_completed);
        assert_eq!(p.chat_message_count, 0);
        assert_eq!(p.high_stress_days, 1);
        assert_eq!(p.engagement_score, 30.0);
        assert!((p.wellbeing_score - 100.0 * (0.6 * 0.3 + 0.4 * 0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_chat_sources_are_additive() {
        let raw = RawActivity {
            events: vec![Event::new(
                "stu-1",
                EventPayload::ChatMessageSent { session_id: None, length: None },
                at(2, 14),
            )],
            messages: vec![message(2, 14, "abcd"), message(2, 15, "ef")],
            ..Default::default()
        };
        let patterns = fold_patterns("stu-1", &raw, date(2));
        let p = &patterns[0];
        assert_eq!(p.chat_message_count, 3);
        assert_eq!(p.chat_rows, 2);
        assert_eq!(p.chat_characters, 6);
        assert_eq!(p.hourly_activity[14], 2);
        assert_eq!(p.hourly_activity[15], 1);
        assert_eq!(p.engagement_score, 6.0);
    }

    #[test]
    fn test_ark_deltas_and_decline() {
        let raw = RawActivity {
            ark_snapshots: vec![
                snapshot("a1", 1, 10.0),
                snapshot("a1", 2, 25.0),
                snapshot("a2", 2, 50.0),
                snapshot("a1", 3, 20.0),
            ],
            ..Default::default()
        };
        let patterns = fold_patterns("stu-1", &raw, date(1));
        assert_eq!(patterns.len(), 3);
        assert_eq!(patterns[2].ark_progress_delta, 0.0);
        assert_eq!(patterns[1].ark_progress_delta, 15.0);
        assert_eq!(patterns[1].declining_progress_days, 0);
        assert_eq!(patterns[0].ark_progress_delta, -5.0);
        assert_eq!(patterns[0].declining_progress_days, 1);
        assert_eq!(patterns[0].engagement_score, 0.0);
        assert_eq!(patterns[1].performance_score, 50.0);
    }

    #[test]
    fn test_missed_checkin_streak() {
        let raw = RawActivity {
            checkins: vec![checkin(2, "calm", 3.0)],
            messages: vec![message(4, 9, "a"), message(5, 9, "b")],
            ..Default::default()
        };
        let patterns = fold_patterns("stu-1", &raw, date(1));
        let streaks: Vec<(NaiveDate, u32)> = patterns
            .iter()
            .map(|p| (p.pattern_date, p.missed_checkin_streak))
            .collect();
        assert_eq!(streaks, vec![(date(5), 3), (date(4), 2), (date(2), 0)]);
    }

    #[test]
    fn test_missed_streak_over_a_long_range() {
        let raw = RawActivity {
            messages: vec![message(5, 9, "first sign of life")],
            ..Default::default()
        };
        let range_start = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
        let patterns = fold_patterns("stu-1", &raw, range_start);
        let expected = (date(5) - range_start).num_days() + 1;
        assert_eq!(patterns.len(), 1);
        assert_eq!(i64::from(patterns[0].missed_checkin_streak), expected);
    }

    #[test]
    fn test_study_sessions_and_performance() {
        let raw = RawActivity {
            events: vec![
                Event::new(
                    "stu-1",
                    EventPayload::StudySessionEnded {
                        session_id: "s".into(),
                        duration_minutes: Some(45.0),
                    },
                    at(2, 19),
                ),
                Event::new(
                    "stu-1",
                    EventPayload::MilestoneCompleted { milestone_id: "m".into(), ark_id: None },
                    at(2, 20),
                ),
                Event::new(
                    "stu-1",
                    EventPayload::XpEarned {
                        amount: 200,
                        source: None,
                    },
                    at(2, 20),
                ),
            ],
            ..Default::default()
        };
        let patterns = fold_patterns("stu-1", &raw, date(2));
        let p = &patterns[0];
        assert_eq!(p.study_minutes, 45.0);
        assert_eq!(p.performance_score, 35.0);
        assert_eq!(p.hourly_activity[20], 2);
    }

    #[tokio::test]
    async fn test_aggregate_reads_store_by_range() {
        let dataset = Dataset {
            checkins: vec![checkin(9, "happy", 4.0), checkin(20, "happy", 4.0)],
            messages: vec![message(10, 9, "in range"), message(2, 9, "too early")],
            events: vec![Event::new("stu-1", EventPayload::CheckinSkipped, at(11, 7))],
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::from_dataset(dataset));
        let aggregator = BehavioralAggregator::new(store.clone(), EventTracker::new(store));

        let patterns = aggregator.aggregate_days("stu-1", 7, at(12, 18)).await;
        let dates: Vec<NaiveDate> = patterns.iter().map(|p| p.pattern_date).collect();
        assert_eq!(dates, vec![date(11), date(10), date(9)]);
        assert!(patterns[2].daily_checkin_completed);
        assert_eq!(patterns[0].missed_checkin_streak, 2);
    }

    #[tokio::test]
    async fn test_aggregate_days_clamps_huge_ranges() {
        let dataset = Dataset {
            checkins: vec![checkin(9, "happy", 4.0)],
            messages: vec![message(10, 9, "hello")],
            ..Default::default()
        };
        let store = Arc::new(MemoryStore::from_dataset(dataset));
        let aggregator = BehavioralAggregator::new(store.clone(), EventTracker::new(store));

        let patterns = aggregator.aggregate_days("stu-1", u32::MAX, at(12, 18)).await;
        let dates: Vec<NaiveDate> = patterns.iter().map(|p| p.pattern_date).collect();
        assert_eq!(dates, vec![date(10), date(9)]);
        assert_eq!(patterns[0].missed_checkin_streak, 1);

        let zero = aggregator.aggregate_days("stu-1", 0, at(10, 18)).await;
        assert_eq!(zero.len(), 1);
        assert_eq!(zero[0].pattern_date, date(10));
    }
}
