//! Learner Flux - Behavioral feature pipeline for student activity
//!
//! Learner Flux turns raw student activity into versioned ML feature vectors
//! through a deterministic pipeline: event tracking → daily behavioral
//! aggregation → feature extraction → feature store.
//!
//! ## Modules
//!
//! - **Tracker**: Append typed activity events to the event log
//! - **Aggregator**: Fold raw activity into one behavioral pattern per day
//! - **Features**: Extract engagement, emotional, performance, behavioral,
//!   profile and social features into an [`MLFeatureVector`]
//! - **Feature Store**: Persist and query vectors keyed by schema version
//! - **Backfill**: Batch extraction across every known student

pub mod aggregator;
pub mod backfill;
pub mod config;
pub mod error;
pub mod feature_store;
pub mod features;
pub mod insights;
pub mod logging;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod tracker;
pub mod types;

pub use aggregator::BehavioralAggregator;
pub use backfill::{Backfill, BackfillFailure, BackfillReport};
pub use config::PipelineConfig;
pub use error::{PipelineError, StoreError};
pub use feature_store::FeatureStore;
pub use features::{FeatureExtractor, FeatureSet, MLFeatureVector};
pub use pipeline::FeaturePipeline;
pub use schema::FeatureVersion;
pub use tracker::{EventTracker, TrackOutcome};

/// Learner Flux version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");
