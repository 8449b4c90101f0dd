//! Error types for Learner Flux

use thiserror::Error;

/// Errors raised by the storage seams (event log, activity reads, feature repository)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Blocking store task failed: {0}")]
    Task(String),
}

/// Errors that can occur while running the feature pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Timed out after {secs}s processing student {student_id}")]
    Timeout { student_id: String, secs: u64 },

    #[error("Unsupported feature version: {0}")]
    UnsupportedFeatureVersion(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_into_pipeline_error() {
        let err: PipelineError = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, PipelineError::Store(StoreError::Unavailable(_))));
        assert_eq!(
            err.to_string(),
            "Store error: Store unavailable: connection refused"
        );
    }

    #[test]
    fn test_timeout_message_names_student() {
        let err = PipelineError::Timeout {
            student_id: "stu-9".to_string(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "Timed out after 30s processing student stu-9");
    }
}
