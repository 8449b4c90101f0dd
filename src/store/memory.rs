//! In-process store backed by a loadable dataset snapshot
//!
//! Implements every storage seam over plain vectors. Useful for tests, for
//! offline runs over an exported dataset, and as the reference semantics for
//! database-backed implementations.

use crate::error::StoreError;
use crate::features::MLFeatureVector;
use crate::schema::FeatureVersion;
use crate::store::{ActivitySource, EventLog, FeatureRepository};
use crate::types::{
    Ark, ArkProgressSnapshot, ChatMessage, CheckIn, Event, Intervention, Milestone, PeerMatch,
    StudentProfile, StudentStats, XpTransaction,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

/// Snapshot of the raw tables the pipeline reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    /// `students` rows; a student exists iff it has a profile here
    pub students: Vec<StudentProfile>,
    pub checkins: Vec<CheckIn>,
    pub events: Vec<Event>,
    pub ark_snapshots: Vec<ArkProgressSnapshot>,
    pub arks: Vec<Ark>,
    pub milestones: Vec<Milestone>,
    pub messages: Vec<ChatMessage>,
    pub xp_transactions: Vec<XpTransaction>,
    pub stats: Vec<StudentStats>,
    pub interventions: Vec<Intervention>,
    pub peer_matches: Vec<PeerMatch>,
}

impl Dataset {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// (student_id, feature_version, extraction_timestamp)
type FeatureKey = (String, &'static str, DateTime<Utc>);

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
    features: RwLock<BTreeMap<FeatureKey, MLFeatureVector>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            features: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored feature vectors across all students and versions
    pub async fn feature_vector_count(&self) -> usize {
        self.features.read().await.len()
    }

    /// Copy of the current raw tables
    pub async fn snapshot(&self) -> Dataset {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl EventLog for MemoryStore {
    async fn append_events(&self, events: &[Event]) -> Result<(), StoreError> {
        self.data.write().await.events.extend_from_slice(events);
        Ok(())
    }

    async fn events_between(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let data = self.data.read().await;
        let mut events: Vec<Event> = data
            .events
            .iter()
            .filter(|e| e.student_id == student_id && e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }
}

#[async_trait]
impl ActivitySource for MemoryStore {
    async fn list_students(&self) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().await;
        Ok(data.students.iter().map(|s| s.student_id.clone()).collect())
    }

    async fn student_profile(
        &self,
        student_id: &str,
    ) -> Result<Option<StudentProfile>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .students
            .iter()
            .find(|s| s.student_id == student_id)
            .cloned())
    }

    async fn checkins(
        &self,
        student_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CheckIn>, StoreError> {
        let data = self.data.read().await;
        let mut rows: Vec<CheckIn> = data
            .checkins
            .iter()
            .filter(|c| c.student_id == student_id && c.date >= start && c.date <= end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    async fn ark_progress(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ArkProgressSnapshot>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .ark_snapshots
            .iter()
            .filter(|s| {
                s.student_id == student_id && s.recorded_at >= start && s.recorded_at <= end
            })
            .cloned()
            .collect())
    }

    async fn arks(&self, student_id: &str) -> Result<Vec<Ark>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .arks
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn milestones(&self, ark_ids: &[String]) -> Result<Vec<Milestone>, StoreError> {
        let wanted: HashSet<&str> = ark_ids.iter().map(String::as_str).collect();
        let data = self.data.read().await;
        Ok(data
            .milestones
            .iter()
            .filter(|m| wanted.contains(m.ark_id.as_str()))
            .cloned()
            .collect())
    }

    async fn chat_messages(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .messages
            .iter()
            .filter(|m| m.student_id == student_id && m.timestamp >= start && m.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn xp_transactions(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<XpTransaction>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .xp_transactions
            .iter()
            .filter(|t| t.student_id == student_id && t.created_at >= start && t.created_at <= end)
            .cloned()
            .collect())
    }

    async fn student_level(&self, student_id: &str) -> Result<Option<u32>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .stats
            .iter()
            .find(|s| s.student_id == student_id)
            .map(|s| s.level))
    }

    async fn count_interventions(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .interventions
            .iter()
            .filter(|i| i.student_id == student_id && i.created_at >= start && i.created_at <= end)
            .count())
    }

    async fn count_peer_matches(&self, student_id: &str) -> Result<usize, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .peer_matches
            .iter()
            .filter(|m| m.student_id == student_id)
            .count())
    }
}

#[async_trait]
impl FeatureRepository for MemoryStore {
    async fn upsert_feature_vector(&self, vector: &MLFeatureVector) -> Result<(), StoreError> {
        let key = (
            vector.student_id.clone(),
            vector.metadata.feature_version.as_str(),
            vector.metadata.extraction_timestamp,
        );
        self.features.write().await.insert(key, vector.clone());
        Ok(())
    }

    async fn latest_feature_vector(
        &self,
        student_id: &str,
        version: FeatureVersion,
    ) -> Result<Option<MLFeatureVector>, StoreError> {
        let features = self.features.read().await;
        Ok(features
            .iter()
            .filter(|((student, v, _), _)| student == student_id && *v == version.as_str())
            .max_by_key(|((_, _, ts), _)| *ts)
            .map(|(_, vector)| vector.clone()))
    }

    async fn latest_feature_vectors(
        &self,
        student_ids: &[String],
        version: FeatureVersion,
    ) -> Result<HashMap<String, MLFeatureVector>, StoreError> {
        let wanted: HashSet<&str> = student_ids.iter().map(String::as_str).collect();
        let features = self.features.read().await;
        let mut latest: HashMap<String, MLFeatureVector> = HashMap::new();

        for ((student, v, ts), vector) in features.iter() {
            if *v != version.as_str() || !wanted.contains(student.as_str()) {
                continue;
            }
            let newer = latest
                .get(student)
                .map_or(true, |existing| *ts > existing.metadata.extraction_timestamp);
            if newer {
                latest.insert(student.clone(), vector.clone());
            }
        }

        Ok(latest)
    }
}
