//! Historical backfill
//!
//! Extracts and stores a feature vector for every known student. Students are
//! processed in sequential batches; within a batch they run concurrently, each
//! bounded by a timeout. One student's failure is recorded in the report and
//! never aborts the rest of the run.

use crate::config::BackfillConfig;
use crate::error::PipelineError;
use crate::pipeline::FeaturePipeline;
use crate::schema::FeatureVersion;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// A student whose vector could not be produced or stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackfillFailure {
    pub student_id: String,
    pub reason: String,
}

/// Outcome of a backfill run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    pub total: usize,
    pub stored: usize,
    pub failures: Vec<BackfillFailure>,
    pub batches: usize,
}

impl BackfillReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct Backfill {
    pipeline: FeaturePipeline,
    student_timeout: Duration,
}

impl Backfill {
    pub fn new(pipeline: FeaturePipeline, config: &BackfillConfig) -> Self {
        Self {
            pipeline,
            student_timeout: Duration::from_secs(config.student_timeout_secs),
        }
    }

    /// Backfill every student as of the current time
    pub async fn run_now(
        &self,
        version: FeatureVersion,
        batch_size: usize,
    ) -> Result<BackfillReport, PipelineError> {
        self.run(version, batch_size, Utc::now()).await
    }

    /// Backfill every student as of `now`.
    ///
    /// Fails only when the student list cannot be read or `batch_size` is 0.
    pub async fn run(
        &self,
        version: FeatureVersion,
        batch_size: usize,
        now: DateTime<Utc>,
    ) -> Result<BackfillReport, PipelineError> {
        if batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be positive".to_string()));
        }

        let students = self.pipeline.source().list_students().await?;
        let mut report = BackfillReport {
            total: students.len(),
            ..Default::default()
        };
        info!(
            students = students.len(),
            batch_size,
            feature_version = %version,
            "starting backfill"
        );

        for (index, batch) in students.chunks(batch_size).enumerate() {
            let results = join_all(
                batch
                    .iter()
                    .map(|student_id| self.backfill_student(student_id, version, now)),
            )
            .await;

            let mut stored = 0;
            for (student_id, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => stored += 1,
                    Err(e) => {
                        error!(student_id = %student_id, error = %e, "backfill failed for student");
                        report.failures.push(BackfillFailure {
                            student_id: student_id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            report.stored += stored;
            report.batches += 1;
            info!(
                batch = index + 1,
                students = batch.len(),
                stored,
                "backfill batch finished"
            );
        }

        info!(
            total = report.total,
            stored = report.stored,
            failed = report.failures.len(),
            "backfill finished"
        );
        Ok(report)
    }

    async fn backfill_student(
        &self,
        student_id: &str,
        version: FeatureVersion,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        match tokio::time::timeout(
            self.student_timeout,
            self.pipeline.run_for_student(student_id, version, now),
        )
        .await
        {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(PipelineError::Timeout {
                student_id: student_id.to_string(),
                secs: self.student_timeout.as_secs(),
            }),
        }
    }
}
