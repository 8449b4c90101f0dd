//! Pipeline orchestration
//!
//! Wires the event tracker, aggregator, extractor and feature store over a
//! set of storage seams and runs them per student:
//! profile read → aggregation → feature extraction → feature store.

use crate::aggregator::BehavioralAggregator;
use crate::error::PipelineError;
use crate::feature_store::FeatureStore;
use crate::features::{FeatureExtractor, MLFeatureVector};
use crate::schema::FeatureVersion;
use crate::store::{ActivitySource, EventLog, FeatureRepository, MemoryStore};
use crate::tracker::EventTracker;
use crate::types::{BehavioralPattern, StudentProfile};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Per-student feature pipeline
#[derive(Clone)]
pub struct FeaturePipeline {
    source: Arc<dyn ActivitySource>,
    tracker: EventTracker,
    aggregator: BehavioralAggregator,
    extractor: FeatureExtractor,
    store: FeatureStore,
}

impl FeaturePipeline {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        events: Arc<dyn EventLog>,
        repository: Arc<dyn FeatureRepository>,
    ) -> Self {
        let tracker = EventTracker::new(events);
        Self {
            aggregator: BehavioralAggregator::new(source.clone(), tracker.clone()),
            extractor: FeatureExtractor::new(source.clone()),
            store: FeatureStore::new(repository),
            tracker,
            source,
        }
    }

    /// Pipeline whose raw reads and feature writes all go to one in-memory store
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn source(&self) -> &Arc<dyn ActivitySource> {
        &self.source
    }

    pub fn aggregator(&self) -> &BehavioralAggregator {
        &self.aggregator
    }

    pub fn tracker(&self) -> &EventTracker {
        &self.tracker
    }

    pub fn feature_store(&self) -> &FeatureStore {
        &self.store
    }

    /// Patterns for the long window of `version`, ending at `now`, newest first
    pub async fn aggregate(
        &self,
        student_id: &str,
        version: FeatureVersion,
        now: DateTime<Utc>,
    ) -> Vec<BehavioralPattern> {
        self.aggregator
            .aggregate_days(student_id, version.windows().long_days, now)
            .await
    }

    pub async fn extract(
        &self,
        student_id: &str,
        patterns: &[BehavioralPattern],
        profile: Option<&StudentProfile>,
        version: FeatureVersion,
        now: DateTime<Utc>,
    ) -> MLFeatureVector {
        self.extractor
            .extract(student_id, patterns, profile, version, now)
            .await
    }

    /// Read the profile, aggregate and extract without storing.
    ///
    /// A failed profile read is an error; a missing profile extracts with
    /// profile defaults.
    pub async fn extract_for_student(
        &self,
        student_id: &str,
        version: FeatureVersion,
        now: DateTime<Utc>,
    ) -> Result<MLFeatureVector, PipelineError> {
        let (profile, patterns) = tokio::join!(
            self.source.student_profile(student_id),
            self.aggregate(student_id, version, now),
        );
        let profile = profile?;
        if profile.is_none() {
            debug!(student_id, "no profile found, extracting with defaults");
        }

        Ok(self
            .extract(student_id, &patterns, profile.as_ref(), version, now)
            .await)
    }

    /// Extract and store one student's vector
    pub async fn run_for_student(
        &self,
        student_id: &str,
        version: FeatureVersion,
        now: DateTime<Utc>,
    ) -> Result<MLFeatureVector, PipelineError> {
        let vector = self.extract_for_student(student_id, version, now).await?;
        self.store.store_feature_vector(&vector).await?;
        Ok(vector)
    }
}
