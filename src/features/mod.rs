//! Feature extraction
//!
//! Turns a student's daily [`BehavioralPattern`] history plus profile into one
//! versioned [`MLFeatureVector`] across six domains. Pattern-derived domains
//! are pure functions of the windowed history; performance and social read
//! auxiliary records and degrade to empty inputs when those reads fail, so a
//! vector is always produced.

mod behavioral;
mod emotional;
mod engagement;
mod performance;
mod profile;
mod social;
mod types;
mod window;

pub use types::*;
pub use window::FeatureWindow;

pub(crate) use window::{mean, population_std_dev, ratio};

use crate::error::StoreError;
use crate::schema::FeatureVersion;
use crate::store::ActivitySource;
use crate::types::{BehavioralPattern, StudentProfile};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Extracts feature vectors, reading auxiliary records from an [`ActivitySource`]
#[derive(Clone)]
pub struct FeatureExtractor {
    source: Arc<dyn ActivitySource>,
}

impl FeatureExtractor {
    pub fn new(source: Arc<dyn ActivitySource>) -> Self {
        Self { source }
    }

    /// Extract one vector with `now` as both the window reference and the
    /// extraction timestamp
    pub async fn extract(
        &self,
        student_id: &str,
        patterns: &[BehavioralPattern],
        profile: Option<&StudentProfile>,
        version: FeatureVersion,
        now: DateTime<Utc>,
    ) -> MLFeatureVector {
        let windows = version.windows();
        let window = FeatureWindow::split(patterns, windows, now);
        let source = self.source.as_ref();

        let (performance, social) = tokio::join!(
            performance::extract(source, student_id, &window, now),
            social::extract(source, student_id, windows.long_days, now),
        );

        let features = FeatureSet {
            engagement: engagement::extract(&window),
            emotional: emotional::extract(&window),
            performance,
            behavioral: behavioral::extract(&window),
            profile: profile::extract(profile, now),
            social,
        };

        debug!(
            student_id,
            feature_version = %version,
            patterns_long = window.long.len(),
            patterns_short = window.short.len(),
            "features extracted"
        );

        MLFeatureVector {
            student_id: student_id.to_string(),
            timestamp: now,
            features,
            metadata: FeatureMetadata {
                feature_version: version,
                extraction_timestamp: now,
            },
        }
    }
}

/// Unwrap an auxiliary read, degrading to the empty value with a warning
pub(crate) fn or_degraded<T: Default>(
    result: Result<T, StoreError>,
    student_id: &str,
    what: &str,
) -> T {
    result.unwrap_or_else(|error| {
        warn!(student_id, read = what, %error, "auxiliary read failed, using empty input");
        T::default()
    })
}
