//! Storage seams for the pipeline
//!
//! The relational store is an external collaborator. The pipeline talks to it
//! only through these traits: an append-only event log, read access to the
//! raw activity tables, and a feature repository keyed by
//! (student, feature version, extraction timestamp).

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use crate::features::MLFeatureVector;
use crate::schema::FeatureVersion;
use crate::types::{
    Ark, ArkProgressSnapshot, ChatMessage, CheckIn, Event, Milestone, StudentProfile,
    XpTransaction,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

pub use memory::{Dataset, MemoryStore};
pub use sqlite::SqliteFeatureRepository;

/// Append-only event log (`data_collection_events`)
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Insert a batch of events in one operation
    async fn append_events(&self, events: &[Event]) -> Result<(), StoreError>;

    /// Events for a student with `start <= timestamp <= end`, newest first
    async fn events_between(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError>;
}

/// Read access to raw activity tables
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Identifiers of every known student
    async fn list_students(&self) -> Result<Vec<String>, StoreError>;

    async fn student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>, StoreError>;

    /// Daily check-ins with `start <= date <= end`
    async fn checkins(
        &self,
        student_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CheckIn>, StoreError>;

    /// ARK progress snapshots recorded in `[start, end]`
    async fn ark_progress(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ArkProgressSnapshot>, StoreError>;

    /// Every ARK the student has, regardless of status
    async fn arks(&self, student_id: &str) -> Result<Vec<Ark>, StoreError>;

    /// Milestones belonging to any of the given ARKs
    async fn milestones(&self, ark_ids: &[String]) -> Result<Vec<Milestone>, StoreError>;

    /// Chat messages sent in `[start, end]` across all of the student's sessions
    async fn chat_messages(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// XP ledger entries created in `[start, end]`
    async fn xp_transactions(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<XpTransaction>, StoreError>;

    /// Current gamification level, if a stats row exists
    async fn student_level(&self, student_id: &str) -> Result<Option<u32>, StoreError>;

    /// Interventions created in `[start, end]`
    async fn count_interventions(
        &self,
        student_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Peer matches ever created for the student
    async fn count_peer_matches(&self, student_id: &str) -> Result<usize, StoreError>;
}

/// Durable feature vector storage (`ml_feature_store`)
#[async_trait]
pub trait FeatureRepository: Send + Sync {
    /// Insert or replace the row keyed by
    /// (student_id, feature_version, extraction_timestamp)
    async fn upsert_feature_vector(&self, vector: &MLFeatureVector) -> Result<(), StoreError>;

    /// Row with the greatest extraction timestamp for student + version
    async fn latest_feature_vector(
        &self,
        student_id: &str,
        version: FeatureVersion,
    ) -> Result<Option<MLFeatureVector>, StoreError>;

    /// Latest row per requested student; students without rows are absent
    async fn latest_feature_vectors(
        &self,
        student_ids: &[String],
        version: FeatureVersion,
    ) -> Result<HashMap<String, MLFeatureVector>, StoreError>;
}
