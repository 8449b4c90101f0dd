//! Event tracker
//!
//! Best-effort recording of student lifecycle events. Recording never returns
//! an error: a failed write is logged and reported as [`TrackOutcome::Skipped`]
//! so the producing feature can carry on.

use crate::store::EventLog;
use crate::types::{Event, EventPayload};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a tracking call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrackOutcome {
    /// Events durably appended
    Recorded { count: usize },
    /// Nothing was written; the reason was logged
    Skipped { reason: String },
}

impl TrackOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, TrackOutcome::Recorded { .. })
    }
}

#[derive(Clone)]
pub struct EventTracker {
    log: Arc<dyn EventLog>,
}

impl EventTracker {
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self { log }
    }

    /// Record one event stamped with the current server time
    pub async fn track_event(&self, student_id: &str, payload: EventPayload) -> TrackOutcome {
        self.track_event_at(student_id, payload, Utc::now()).await
    }

    /// Record one event with an explicit timestamp
    pub async fn track_event_at(
        &self,
        student_id: &str,
        payload: EventPayload,
        at: DateTime<Utc>,
    ) -> TrackOutcome {
        let event = Event::new(student_id, payload, at);
        let event_type = event.event_type().as_str();

        match self.log.append_events(std::slice::from_ref(&event)).await {
            Ok(()) => {
                debug!(student_id, event_type, "event tracked");
                TrackOutcome::Recorded { count: 1 }
            }
            Err(error) => {
                warn!(student_id, event_type, %error, "event tracking failed");
                TrackOutcome::Skipped {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Record a batch of caller-timestamped events in one write
    pub async fn track_events(&self, events: &[Event]) -> TrackOutcome {
        if events.is_empty() {
            return TrackOutcome::Recorded { count: 0 };
        }

        match self.log.append_events(events).await {
            Ok(()) => {
                debug!(count = events.len(), "event batch tracked");
                TrackOutcome::Recorded {
                    count: events.len(),
                }
            }
            Err(error) => {
                warn!(count = events.len(), %error, "event batch tracking failed");
                TrackOutcome::Skipped {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Events for a student in `[start, end]`, newest first; empty on read failure
    pub async fn get_student_events(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Event> {
        match self.log.events_between(student_id, start, end).await {
            Ok(mut events) => {
                events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                events
            }
            Err(error) => {
                warn!(student_id, %error, "event read failed, returning no events");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Event log that rejects every call and counts attempts
    #[derive(Default)]
    struct BrokenLog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventLog for BrokenLog {
        async fn append_events(&self, _events: &[Event]) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn events_between(
            &self,
            _student_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<Event>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Query("timeout".to_string()))
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_track_and_read_back() {
        let tracker = EventTracker::new(Arc::new(MemoryStore::new()));

        let outcome = tracker
            .track_event_at("stu-1", EventPayload::XpEarned { amount: 25, source: None }, at(9))
            .await;
        assert_eq!(outcome, TrackOutcome::Recorded { count: 1 });

        tracker
            .track_event_at(
                "stu-1",
                EventPayload::MilestoneCompleted { milestone_id: "m1".into(), ark_id: None },
                at(11),
            )
            .await;

        let events = tracker
            .get_student_events("stu-1", at(0), at(23))
            .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, at(11));
    }

    #[tokio::test]
    async fn test_failures_are_skipped_not_raised() {
        let log = Arc::new(BrokenLog::default());
        let tracker = EventTracker::new(log.clone());

        let outcome = tracker
            .track_event("stu-1", EventPayload::CheckinCompleted { checkin_id: None })
            .await;
        assert!(matches!(
            outcome,
            TrackOutcome::Skipped { ref reason } if reason.contains("disk full")
        ));

        let batch = vec![Event::new("stu-1", EventPayload::CheckinSkipped, at(8))];
        assert!(!tracker.track_events(&batch).await.is_recorded());

        let events = tracker
            .get_student_events("stu-1", at(0) - Duration::days(1), at(0))
            .await;
        assert!(events.is_empty());
        assert_eq!(log.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let log = Arc::new(BrokenLog::default());
        let tracker = EventTracker::new(log.clone());

        assert_eq!(tracker.track_events(&[]).await, TrackOutcome::Recorded { count: 0 });
        assert_eq!(log.calls.load(Ordering::SeqCst), 0);
    }
}
