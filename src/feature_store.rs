//! Feature store
//!
//! Durable keyed storage of [`MLFeatureVector`]s. Writes propagate failures,
//! since a silently dropped snapshot would leave a gap in training data.
//! Reads treat failures like "not found" so consumers can skip scoring.

use crate::error::PipelineError;
use crate::features::MLFeatureVector;
use crate::schema::FeatureVersion;
use crate::store::FeatureRepository;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct FeatureStore {
    repository: Arc<dyn FeatureRepository>,
}

impl FeatureStore {
    pub fn new(repository: Arc<dyn FeatureRepository>) -> Self {
        Self { repository }
    }

    /// Upsert keyed by (student, version, extraction timestamp)
    pub async fn store_feature_vector(
        &self,
        vector: &MLFeatureVector,
    ) -> Result<(), PipelineError> {
        let feature_version = vector.metadata.feature_version;
        match self.repository.upsert_feature_vector(vector).await {
            Ok(()) => {
                debug!(
                    student_id = %vector.student_id,
                    %feature_version,
                    "feature vector stored"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    student_id = %vector.student_id,
                    %feature_version,
                    error = %e,
                    "failed to store feature vector"
                );
                Err(e.into())
            }
        }
    }

    /// Most recent vector for a student and version, if any
    pub async fn get_latest_feature_vector(
        &self,
        student_id: &str,
        version: FeatureVersion,
    ) -> Option<MLFeatureVector> {
        self.repository
            .latest_feature_vector(student_id, version)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    student_id,
                    feature_version = %version,
                    error = %e,
                    "feature vector read failed"
                );
                None
            })
    }

    /// Most recent vector per student; students without one are absent
    pub async fn get_feature_vectors(
        &self,
        student_ids: &[String],
        version: FeatureVersion,
    ) -> HashMap<String, MLFeatureVector> {
        if student_ids.is_empty() {
            return HashMap::new();
        }
        self.repository
            .latest_feature_vectors(student_ids, version)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    students = student_ids.len(),
                    feature_version = %version,
                    error = %e,
                    "batch feature vector read failed"
                );
                HashMap::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::features::{FeatureMetadata, FeatureSet};
    use crate::store::{MemoryStore, SqliteFeatureRepository};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    struct FailingRepository;

    #[async_trait]
    impl FeatureRepository for FailingRepository {
        async fn upsert_feature_vector(&self, _: &MLFeatureVector) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("read-only replica".to_string()))
        }
        async fn latest_feature_vector(
            &self,
            _: &str,
            _: FeatureVersion,
        ) -> Result<Option<MLFeatureVector>, StoreError> {
            Err(StoreError::Query("timeout".to_string()))
        }
        async fn latest_feature_vectors(
            &self,
            _: &[String],
            _: FeatureVersion,
        ) -> Result<HashMap<String, MLFeatureVector>, StoreError> {
            Err(StoreError::Query("timeout".to_string()))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 6, 0, 0).unwrap()
    }

    fn vector(student_id: &str, at: DateTime<Utc>, chat: u32) -> MLFeatureVector {
        let mut features = FeatureSet::default();
        features.engagement.chat_message_count_30d = chat;
        features.emotional.avg_emotion_score_30d = 0.65;
        features.behavioral.avg_daily_activity_time = Some(1.25);
        MLFeatureVector {
            student_id: student_id.to_string(),
            timestamp: at,
            features,
            metadata: FeatureMetadata {
                feature_version: FeatureVersion::CURRENT,
                extraction_timestamp: at,
            },
        }
    }

    async fn check_round_trip(store: FeatureStore) {
        let stored = vector("stu-1", t0(), 12);
        store.store_feature_vector(&stored).await.unwrap();

        let loaded = store
            .get_latest_feature_vector("stu-1", FeatureVersion::CURRENT)
            .await
            .unwrap();
        assert_eq!(loaded.features, stored.features);
        assert!(store
            .get_latest_feature_vector("stu-2", FeatureVersion::CURRENT)
            .await
            .is_none());
    }

    async fn check_batch(store: FeatureStore) {
        store.store_feature_vector(&vector("stu-1", t0(), 1)).await.unwrap();
        store
            .store_feature_vector(&vector("stu-1", t0() + Duration::days(1), 2))
            .await
            .unwrap();
        store.store_feature_vector(&vector("stu-2", t0(), 3)).await.unwrap();

        let ids = vec!["stu-1".to_string(), "stu-2".to_string(), "stu-9".to_string()];
        let found = store.get_feature_vectors(&ids, FeatureVersion::CURRENT).await;
        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("stu-9"));
        assert_eq!(found["stu-1"].features.engagement.chat_message_count_30d, 2);
        assert_eq!(found["stu-2"].features.engagement.chat_message_count_30d, 3);
    }

    #[tokio::test]
    async fn test_round_trip_memory() {
        check_round_trip(FeatureStore::new(Arc::new(MemoryStore::new()))).await;
    }

    #[tokio::test]
    async fn test_round_trip_sqlite() {
        let repo = SqliteFeatureRepository::open_in_memory().unwrap();
        check_round_trip(FeatureStore::new(Arc::new(repo))).await;
    }

    #[tokio::test]
    async fn test_batch_latest_memory() {
        check_batch(FeatureStore::new(Arc::new(MemoryStore::new()))).await;
    }

    #[tokio::test]
    async fn test_batch_latest_sqlite() {
        let repo = SqliteFeatureRepository::open_in_memory().unwrap();
        check_batch(FeatureStore::new(Arc::new(repo))).await;
    }

    #[tokio::test]
    async fn test_write_failure_propagates_read_failure_does_not() {
        let store = FeatureStore::new(Arc::new(FailingRepository));

        let err = store
            .store_feature_vector(&vector("stu-1", t0(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Unavailable(_))));

        assert!(store
            .get_latest_feature_vector("stu-1", FeatureVersion::CURRENT)
            .await
            .is_none());
        assert!(store
            .get_feature_vectors(&["stu-1".to_string()], FeatureVersion::CURRENT)
            .await
            .is_empty());
    }
}
