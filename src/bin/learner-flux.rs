//! Learner Flux CLI - Command-line interface for the feature pipeline
//!
//! Commands:
//! - aggregate: Daily behavioral patterns for one student
//! - extract: Feature vector for one student (not stored)
//! - insights: Engagement, emotional and time-series summaries
//! - backfill: Extract every student of a dataset into a SQLite feature store
//! - latest: Most recent stored vector for a student
//! - schema: Print the feature schema registry

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use learner_flux::aggregator::MAX_AGGREGATION_DAYS;
use learner_flux::insights::{
    emotional_pattern, engagement_metrics, time_series_features, EmotionalPattern,
    EngagementMetrics, TimeSeriesFeatures,
};
use learner_flux::store::{Dataset, MemoryStore, SqliteFeatureRepository};
use learner_flux::{
    logging, Backfill, FeaturePipeline, FeatureStore, FeatureVersion, PipelineConfig,
    PipelineError, StoreError, FLUX_VERSION,
};

/// Config file read from the working directory when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "learner-flux.json";

/// Learner Flux - Behavioral feature pipeline for student activity
#[derive(Parser)]
#[command(name = "learner-flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn student activity into versioned ML feature vectors", long_about = None)]
struct Cli {
    /// Pipeline config file (JSON); defaults to ./learner-flux.json if present
    #[arg(long, global = true, env = "LEARNER_FLUX_CONFIG")]
    config: Option<PathBuf>,

    /// Reference instant (RFC 3339); defaults to the current time
    #[arg(long, global = true)]
    now: Option<String>,

    /// Pretty-print JSON output even when stdout is not a terminal
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate daily behavioral patterns for one student
    Aggregate {
        /// Dataset file (JSON)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Student ID
        #[arg(short, long)]
        student: String,

        /// Number of calendar days ending today
        #[arg(long, default_value = "30", value_parser = days_parser())]
        days: u32,
    },

    /// Extract a feature vector for one student without storing it
    Extract {
        /// Dataset file (JSON)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Student ID
        #[arg(short, long)]
        student: String,

        /// Feature schema version (defaults to the configured one)
        #[arg(long)]
        feature_version: Option<String>,
    },

    /// Summarize recent patterns for dashboards
    Insights {
        /// Dataset file (JSON)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Student ID
        #[arg(short, long)]
        student: String,

        /// Window in days
        #[arg(long, default_value = "30", value_parser = days_parser())]
        days: u32,
    },

    /// Extract and store vectors for every student of a dataset
    Backfill {
        /// Dataset file (JSON)
        #[arg(short, long)]
        dataset: PathBuf,

        /// SQLite feature store path
        #[arg(long)]
        db: PathBuf,

        /// Feature schema version (defaults to the configured one)
        #[arg(long)]
        feature_version: Option<String>,

        /// Students per batch (defaults to the configured one)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Print the most recent stored vector for a student
    Latest {
        /// SQLite feature store path
        #[arg(long)]
        db: PathBuf,

        /// Student ID
        #[arg(short, long)]
        student: String,

        /// Feature schema version (defaults to the configured one)
        #[arg(long)]
        feature_version: Option<String>,
    },

    /// Print the feature schema registry
    Schema,
}

fn days_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=i64::from(MAX_AGGREGATION_DAYS))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let exit = e.exit_code();
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            exit
        }
    }
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    let config = load_config(cli.config.as_deref())?;
    logging::init(&config.log);

    let requested_now = parse_now(cli.now.as_deref())?;
    let now = requested_now.unwrap_or_else(Utc::now);
    let output = Output {
        pretty: cli.pretty || atty::is(atty::Stream::Stdout),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Aggregate {
            dataset,
            student,
            days,
        } => runtime.block_on(cmd_aggregate(&dataset, &student, days, now, &output)),

        Commands::Extract {
            dataset,
            student,
            feature_version,
        } => {
            let version = resolve_version(feature_version.as_deref(), &config)?;
            runtime.block_on(cmd_extract(&dataset, &student, version, now, &output))
        }

        Commands::Insights {
            dataset,
            student,
            days,
        } => runtime.block_on(cmd_insights(&dataset, &student, days, now, &output)),

        Commands::Backfill {
            dataset,
            db,
            feature_version,
            batch_size,
        } => {
            let version = resolve_version(feature_version.as_deref(), &config)?;
            let batch_size = batch_size.unwrap_or(config.backfill.batch_size);
            runtime.block_on(cmd_backfill(
                &dataset,
                &db,
                version,
                batch_size,
                &config,
                requested_now,
                &output,
            ))
        }

        Commands::Latest {
            db,
            student,
            feature_version,
        } => {
            let version = resolve_version(feature_version.as_deref(), &config)?;
            runtime.block_on(cmd_latest(&db, &student, version, &output))
        }

        Commands::Schema => cmd_schema(&output),
    }
}

async fn cmd_aggregate(
    dataset: &Path,
    student_id: &str,
    days: u32,
    now: DateTime<Utc>,
    output: &Output,
) -> Result<(), CliFailure> {
    let pipeline = FeaturePipeline::in_memory(load_dataset(dataset)?);
    let patterns = pipeline
        .aggregator()
        .aggregate_days(student_id, days, now)
        .await;
    output.print(&patterns)
}

async fn cmd_extract(
    dataset: &Path,
    student_id: &str,
    version: FeatureVersion,
    now: DateTime<Utc>,
    output: &Output,
) -> Result<(), CliFailure> {
    let pipeline = FeaturePipeline::in_memory(load_dataset(dataset)?);
    let vector = pipeline.extract_for_student(student_id, version, now).await?;
    output.print(&vector)
}

#[derive(Serialize)]
struct InsightsReport {
    student_id: String,
    days: u32,
    engagement: EngagementMetrics,
    emotional: EmotionalPattern,
    time_series: TimeSeriesFeatures,
}

async fn cmd_insights(
    dataset: &Path,
    student_id: &str,
    days: u32,
    now: DateTime<Utc>,
    output: &Output,
) -> Result<(), CliFailure> {
    let pipeline = FeaturePipeline::in_memory(load_dataset(dataset)?);
    let patterns = pipeline
        .aggregator()
        .aggregate_days(student_id, days, now)
        .await;

    output.print(&InsightsReport {
        student_id: student_id.to_string(),
        days,
        engagement: engagement_metrics(&patterns, days),
        emotional: emotional_pattern(&patterns, days),
        time_series: time_series_features(&patterns),
    })
}

async fn cmd_backfill(
    dataset: &Path,
    db: &Path,
    version: FeatureVersion,
    batch_size: usize,
    config: &PipelineConfig,
    now: Option<DateTime<Utc>>,
    output: &Output,
) -> Result<(), CliFailure> {
    let store = load_dataset(dataset)?;
    let repository = Arc::new(SqliteFeatureRepository::open(db).map_err(PipelineError::from)?);
    let pipeline = FeaturePipeline::new(store.clone(), store, repository);

    let backfill = Backfill::new(pipeline, &config.backfill);
    let report = match now {
        Some(now) => backfill.run(version, batch_size, now).await?,
        None => backfill.run_now(version, batch_size).await?,
    };
    output.print(&report)?;

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliFailure::BackfillIncomplete(report.failures.len()))
    }
}

async fn cmd_latest(
    db: &Path,
    student_id: &str,
    version: FeatureVersion,
    output: &Output,
) -> Result<(), CliFailure> {
    let repository = SqliteFeatureRepository::open(db).map_err(PipelineError::from)?;
    let store = FeatureStore::new(Arc::new(repository));

    match store.get_latest_feature_vector(student_id, version).await {
        Some(vector) => output.print(&vector),
        None => Err(CliFailure::NotFound {
            student_id: student_id.to_string(),
            version,
        }),
    }
}

#[derive(Serialize)]
struct SchemaEntry {
    feature_version: FeatureVersion,
    long_window_days: u32,
    short_window_days: u32,
    fields: &'static [&'static str],
}

fn cmd_schema(output: &Output) -> Result<(), CliFailure> {
    let entries: Vec<SchemaEntry> = FeatureVersion::ALL
        .iter()
        .map(|version| {
            let windows = version.windows();
            SchemaEntry {
                feature_version: *version,
                long_window_days: windows.long_days,
                short_window_days: windows.short_days,
                fields: version.field_names(),
            }
        })
        .collect();
    output.print(&entries)
}

fn load_dataset(path: &Path) -> Result<Arc<MemoryStore>, CliFailure> {
    let json = std::fs::read_to_string(path)?;
    let dataset = Dataset::from_json(&json).map_err(PipelineError::from)?;
    Ok(Arc::new(MemoryStore::from_dataset(dataset)))
}

/// An explicit `--config` must exist; the default file is optional
fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliFailure> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => Ok(PipelineConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?),
    }
}

fn parse_now(now: Option<&str>) -> Result<Option<DateTime<Utc>>, CliFailure> {
    now.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CliFailure::from(PipelineError::InvalidDate(format!("{s}: {e}"))))
    })
    .transpose()
}

fn resolve_version(
    requested: Option<&str>,
    config: &PipelineConfig,
) -> Result<FeatureVersion, CliFailure> {
    match requested {
        Some(s) => Ok(FeatureVersion::from_str(s)?),
        None => Ok(config.feature_version),
    }
}

struct Output {
    pretty: bool,
}

impl Output {
    fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), CliFailure> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .map_err(PipelineError::from)?;

        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        Ok(())
    }
}

// Error handling

#[derive(Debug)]
enum CliFailure {
    Pipeline(PipelineError),
    NotFound {
        student_id: String,
        version: FeatureVersion,
    },
    BackfillIncomplete(usize),
}

impl CliFailure {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliFailure::NotFound { .. } => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

impl From<PipelineError> for CliFailure {
    fn from(e: PipelineError) -> Self {
        CliFailure::Pipeline(e)
    }
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Pipeline(PipelineError::Io(e))
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::NotFound {
                student_id,
                version,
            } => CliError {
                code: "NOT_FOUND".to_string(),
                message: format!("No feature vector for student {student_id} at version {version}"),
                hint: Some("Run 'learner-flux backfill' to populate the store".to_string()),
            },
            CliFailure::BackfillIncomplete(count) => CliError {
                code: "BACKFILL_INCOMPLETE".to_string(),
                message: format!("{} students failed during backfill", count),
                hint: Some("See the failures list in the report on stdout".to_string()),
            },
            CliFailure::Pipeline(e) => pipeline_error(e),
        }
    }
}

fn pipeline_error(e: PipelineError) -> CliError {
    let (code, hint) = match &e {
        PipelineError::Store(StoreError::Serialization(_)) | PipelineError::Json(_) => {
            ("JSON_ERROR", "Check JSON syntax and field names")
        }
        PipelineError::Store(_) => ("STORE_ERROR", "Check the dataset and database paths"),
        PipelineError::Timeout { .. } => ("TIMEOUT", "Raise backfill.student_timeout_secs"),
        PipelineError::UnsupportedFeatureVersion(_) => {
            ("UNSUPPORTED_VERSION", "Run 'learner-flux schema' to list versions")
        }
        PipelineError::Config(_) => ("CONFIG_ERROR", "Fix the config file and retry"),
        PipelineError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
        PipelineError::InvalidDate(_) => {
            ("INVALID_DATE", "Use RFC 3339, e.g. 2024-09-01T00:00:00Z")
        }
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate_args(days: &str) -> Vec<&str> {
        vec!["learner-flux", "aggregate", "-d", "data.json", "-s", "stu-1", "--days", days]
    }

    #[test]
    fn test_days_outside_range_are_rejected() {
        assert!(Cli::try_parse_from(aggregate_args("4294967295")).is_err());
        assert!(Cli::try_parse_from(aggregate_args("0")).is_err());
        assert!(Cli::try_parse_from(aggregate_args("3651")).is_err());

        let cli = Cli::try_parse_from(aggregate_args("3650")).unwrap();
        assert!(matches!(cli.command, Commands::Aggregate { days: 3650, .. }));
    }

    #[test]
    fn test_now_is_optional() {
        assert!(parse_now(None).unwrap().is_none());

        let now = parse_now(Some("2024-09-01T03:00:00Z")).unwrap().unwrap();
        assert_eq!(now.to_rfc3339(), "2024-09-01T03:00:00+00:00");
        assert!(parse_now(Some("yesterday")).is_err());
    }

    #[test]
    fn test_config_file_is_optional_unless_named() {
        let missing = std::env::temp_dir().join("learner-flux-no-such-config.json");
        assert!(load_config(Some(&missing)).is_err());

        let config = PipelineConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.backfill.batch_size, PipelineConfig::default().backfill.batch_size);
    }
}
