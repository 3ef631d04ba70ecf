//! quizfix CLI - fixture tooling for quiz-session datasets
//!
//! Commands:
//! - features: Compute cluster_features for every session of dataset files
//! - backfill: Fill in missing cluster_features from a donor dataset
//! - generate: Generate flat logs, vector sessions, demo logs or a clustered dataset
//! - migrate: Convert legacy log files to the flat dataset layout
//! - merge: Merge student log files into one multi-session document
//! - index: Rebuild index.json for a dataset directory
//! - verify: Check generated flat logs for consistency
//! - schema: Print the feature layout or a default generator configuration

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use quizlog_fixtures::features::{FeatureConfig, FeatureReducer, FEATURE_NAMES};
use quizlog_fixtures::generator::clusters::write_cluster_dataset;
use quizlog_fixtures::generator::demo::write_demo_dataset;
use quizlog_fixtures::generator::logs::write_flat_logs;
use quizlog_fixtures::generator::sessions::write_vector_sessions;
use quizlog_fixtures::generator::{
    default_base_instant, generate_clusters, generate_demo, generate_logs, generate_sessions,
    make_rng, ClusterGenConfig, DemoGenConfig, LogGenConfig, QuizDefinition, SessionGenConfig,
};
use quizlog_fixtures::index::regenerate_index;
use quizlog_fixtures::pipeline::{AnnotateReport, FeatureProcessor};
use quizlog_fixtures::schema::merge::MERGED_FILE_NAME;
use quizlog_fixtures::schema::{
    merge_files, migrate_dir, migrate_file, verify_file, MigrateOptions, MigrateOutcome,
};
use quizlog_fixtures::store::{load_typed, SkippedFile};
use quizlog_fixtures::types::DatasetType;
use quizlog_fixtures::{AxisRange, FixtureError, FIXTURES_VERSION};

/// quizfix - Generate, migrate and validate quiz-session fixtures
#[derive(Parser)]
#[command(name = "quizfix")]
#[command(version = FIXTURES_VERSION)]
#[command(about = "Generate, migrate and validate quiz-session fixture data", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute cluster_features for every session of dataset files
    Features {
        /// Dataset files to annotate in place
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Range the per-log axis scores were generated in
        #[arg(long, value_enum, default_value = "unit")]
        axis_range: AxisRangeArg,

        /// Feature configuration file (JSON); overrides --axis-range
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Fill in missing cluster_features, preferring a donor dataset
    Backfill {
        /// Dataset file to update in place
        input: PathBuf,

        /// Dataset whose session features are reused in order
        #[arg(long)]
        donor: Option<PathBuf>,

        /// Range the per-log axis scores were generated in
        #[arg(long, value_enum, default_value = "unit")]
        axis_range: AxisRangeArg,
    },

    /// Generate synthetic fixtures
    Generate {
        #[command(subcommand)]
        kind: GenerateKind,
    },

    /// Convert legacy log files to the flat dataset layout
    Migrate {
        /// Dataset file or directory of dataset files
        path: PathBuf,

        /// Dataset name (single file only; inferred from the file name otherwise)
        #[arg(long)]
        name: Option<String>,

        /// Dataset type
        #[arg(long = "type", value_enum)]
        dataset_type: Option<DatasetTypeArg>,
    },

    /// Merge student log files into one multi-session document
    Merge {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = MERGED_FILE_NAME)]
        output: PathBuf,
    },

    /// Rebuild index.json for a dataset directory
    Index {
        /// Dataset directory
        #[arg(long, default_value = "students")]
        dir: PathBuf,

        /// Include per-dataset session listings
        #[arg(long)]
        sessions: bool,
    },

    /// Check generated flat logs for consistency
    Verify {
        /// Dataset file
        input: PathBuf,
    },

    /// Print the feature layout or a default generator configuration
    Schema {
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Subcommand)]
enum GenerateKind {
    /// Flat quiz logs stored under `logs`
    Logs {
        #[arg(short, long, default_value = "students/quiz_log_dummy.json")]
        output: PathBuf,

        /// Number of logs
        #[arg(long)]
        count: Option<usize>,

        #[command(flatten)]
        common: GenerateArgs,
    },

    /// Multi-session vector fixtures stored under `vector_test_sessions`
    Sessions {
        #[arg(short, long, default_value = "students/quiz_log_dummy.json")]
        output: PathBuf,

        /// Number of sessions
        #[arg(long)]
        count: Option<usize>,

        /// Range of the per-log axis scores
        #[arg(long, value_enum)]
        axis_range: Option<AxisRangeArg>,

        #[command(flatten)]
        common: GenerateArgs,
    },

    /// Multi-session demo logs for a project's quiz.json, registered in index.json
    Demo {
        /// The project's quiz.json
        #[arg(long)]
        quiz: PathBuf,

        /// Project id (defaults to the quiz file's directory name)
        #[arg(long)]
        project: Option<String>,

        /// Dataset directory
        #[arg(long, default_value = "students")]
        dir: PathBuf,

        /// Number of sessions
        #[arg(long)]
        count: Option<usize>,

        #[command(flatten)]
        common: GenerateArgs,
    },

    /// Clustered dataset with ground-truth profiles, registered in index.json
    Clusters {
        /// Dataset directory
        #[arg(long, default_value = "students")]
        dir: PathBuf,

        #[command(flatten)]
        common: GenerateArgs,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Generator configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Instant timestamps are generated before (RFC 3339)
    #[arg(long)]
    base: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AxisRangeArg {
    /// Scores in [-1, 1]
    Unit,
    /// Scores in [-3, 3]
    Wide,
}

impl From<AxisRangeArg> for AxisRange {
    fn from(arg: AxisRangeArg) -> Self {
        match arg {
            AxisRangeArg::Unit => AxisRange::UNIT,
            AxisRangeArg::Wide => AxisRange::WIDE,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DatasetTypeArg {
    Class,
    Student,
}

impl From<DatasetTypeArg> for DatasetType {
    fn from(arg: DatasetTypeArg) -> Self {
        match arg {
            DatasetTypeArg::Class => DatasetType::Class,
            DatasetTypeArg::Student => DatasetType::Student,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Feature vector layout
    Features,
    /// Default `generate logs` configuration
    Logs,
    /// Default `generate sessions` configuration
    Sessions,
    /// Default `generate clusters` configuration
    Clusters,
    /// Default `generate demo` configuration
    Demo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), QuizfixCliError> {
    let json = cli.json;
    match cli.command {
        Commands::Features {
            inputs,
            axis_range,
            config,
        } => cmd_features(&inputs, axis_range, config.as_deref(), json),
        Commands::Backfill {
            input,
            donor,
            axis_range,
        } => cmd_backfill(&input, donor.as_deref(), axis_range, json),
        Commands::Generate { kind } => cmd_generate(kind, json),
        Commands::Migrate {
            path,
            name,
            dataset_type,
        } => cmd_migrate(&path, name, dataset_type, json),
        Commands::Merge { inputs, output } => cmd_merge(&inputs, &output, json),
        Commands::Index { dir, sessions } => cmd_index(&dir, sessions, json),
        Commands::Verify { input } => cmd_verify(&input, json),
        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_features(
    inputs: &[PathBuf],
    axis_range: AxisRangeArg,
    config: Option<&Path>,
    json: bool,
) -> Result<(), QuizfixCliError> {
    let config = match config {
        Some(path) => load_typed::<FeatureConfig>(path)?,
        None => FeatureConfig::default().with_axis_range(axis_range.into()),
    };
    let processor = FeatureProcessor::new(FeatureReducer::new(config)?);

    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for input in inputs {
        match processor.annotate_file(input) {
            Ok(report) => files.push(FileFeatures {
                file: input.display().to_string(),
                report,
            }),
            Err(e) => {
                error!("skipping {}: {e}", input.display());
                skipped.push(SkippedFile {
                    file: input.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let report = FeaturesReport { files, skipped };
    if json {
        print_json(&report)?;
    } else {
        println!("Feature Report");
        println!("==============");
        for file in &report.files {
            println!(
                "{}: {} of {} sessions annotated ({} without logs)",
                file.file, file.report.annotated, file.report.sessions_seen, file.report.skipped
            );
            if file.report.dropped_records > 0 {
                println!("  dropped {} non-object log entries", file.report.dropped_records);
            }
            if file.report.out_of_range_axis_samples > 0 {
                println!(
                    "  {} axis scores outside the configured range",
                    file.report.out_of_range_axis_samples
                );
            }
        }
        print_skipped(&report.skipped);
    }

    if report.skipped.is_empty() {
        Ok(())
    } else {
        Err(QuizfixCliError::FilesSkipped(report.skipped.len()))
    }
}

fn cmd_backfill(
    input: &Path,
    donor: Option<&Path>,
    axis_range: AxisRangeArg,
    json: bool,
) -> Result<(), QuizfixCliError> {
    let config = FeatureConfig::default().with_axis_range(axis_range.into());
    let processor = FeatureProcessor::new(FeatureReducer::new(config)?);
    let report = processor.backfill_file(input, donor)?;

    if json {
        print_json(&report)?;
    } else {
        println!("Backfill Report");
        println!("===============");
        println!("Sessions:          {}", report.sessions_seen);
        println!("Already present:   {}", report.already_present);
        println!("From donor:        {}", report.from_donor);
        println!("Computed from logs: {}", report.computed);
    }
    Ok(())
}

fn cmd_generate(kind: GenerateKind, json: bool) -> Result<(), QuizfixCliError> {
    let now = Utc::now();
    let summary = match kind {
        GenerateKind::Logs {
            output,
            count,
            common,
        } => {
            let mut config: LogGenConfig = load_config(common.config.as_deref())?;
            if let Some(count) = count {
                config.count = count;
            }
            let base = parse_base(common.base.as_deref())?.unwrap_or(now);
            let mut rng = make_rng(common.seed);
            let logs = generate_logs(&config, &mut rng, base)?;
            write_flat_logs(&output, &logs, now)?;
            GenerateSummary {
                output: output.display().to_string(),
                sessions: 0,
                logs: logs.len(),
                correct: logs.iter().filter(|log| log.correct).count(),
            }
        }
        GenerateKind::Sessions {
            output,
            count,
            axis_range,
            common,
        } => {
            let mut config: SessionGenConfig = load_config(common.config.as_deref())?;
            if let Some(count) = count {
                config.session_count = count;
            }
            if let Some(axis_range) = axis_range {
                config.axis_range = axis_range.into();
            }
            let base = parse_base(common.base.as_deref())?.unwrap_or_else(default_base_instant);
            let mut rng = make_rng(common.seed);
            let collection = generate_sessions(&config, &mut rng, base)?;
            write_vector_sessions(&output, &collection, base)?;
            let logs: Vec<_> = collection.sessions.iter().flat_map(|s| &s.logs).collect();
            GenerateSummary {
                output: output.display().to_string(),
                sessions: collection.sessions.len(),
                logs: logs.len(),
                correct: logs.iter().filter(|log| log.correct).count(),
            }
        }
        GenerateKind::Demo {
            quiz,
            project,
            dir,
            count,
            common,
        } => {
            let mut config: DemoGenConfig = load_config(common.config.as_deref())?;
            if let Some(project) = project.or_else(|| project_from_quiz_path(&quiz)) {
                config.project_id = project;
            }
            if let Some(count) = count {
                config.session_count = count;
            }
            let quiz = QuizDefinition::load(&quiz)?;
            let base = parse_base(common.base.as_deref())?.unwrap_or(now);
            let mut rng = make_rng(common.seed);
            let dataset = generate_demo(&config, &quiz, &mut rng, base)?;
            let output = write_demo_dataset(&dir, &config, &dataset)?;
            let logs: Vec<_> = dataset.sessions.iter().flat_map(|s| &s.logs).collect();
            GenerateSummary {
                output: output.display().to_string(),
                sessions: dataset.sessions.len(),
                logs: logs.len(),
                correct: logs.iter().filter(|log| log.correct).count(),
            }
        }
        GenerateKind::Clusters { dir, common } => {
            let config: ClusterGenConfig = load_config(common.config.as_deref())?;
            let base = parse_base(common.base.as_deref())?.unwrap_or(now);
            let mut rng = make_rng(common.seed);
            let dataset = generate_clusters(&config, &mut rng, base)?;
            let output = write_cluster_dataset(&dir, &dataset)?;
            let logs: Vec<_> = dataset.sessions.iter().flat_map(|s| &s.logs).collect();
            GenerateSummary {
                output: output.display().to_string(),
                sessions: dataset.sessions.len(),
                logs: logs.len(),
                correct: logs.iter().filter(|log| log.correct).count(),
            }
        }
    };

    if json {
        print_json(&summary)?;
    } else {
        println!("Wrote {}", summary.output);
        if summary.sessions > 0 {
            println!("  Sessions: {}", summary.sessions);
        }
        println!("  Logs:     {}", summary.logs);
        if summary.logs > 0 {
            println!(
                "  Correct:  {} ({:.1}%)",
                summary.correct,
                summary.correct as f64 / summary.logs as f64 * 100.0
            );
        }
    }
    Ok(())
}

fn cmd_migrate(
    path: &Path,
    name: Option<String>,
    dataset_type: Option<DatasetTypeArg>,
    json: bool,
) -> Result<(), QuizfixCliError> {
    let options = MigrateOptions {
        dataset_name: name,
        dataset_type: dataset_type.map(DatasetType::from),
        ..MigrateOptions::default()
    };

    if path.is_dir() {
        let report = migrate_dir(path, &options)?;
        if json {
            print_json(&report)?;
        } else {
            println!("Migration Report");
            println!("================");
            for file in &report.files {
                println!("{}: {}", file.file, describe_outcome(&file.outcome));
            }
            print_skipped(&report.skipped);
            println!("\n{} file(s) migrated", report.migrated_count());
        }
        return if report.skipped.is_empty() {
            Ok(())
        } else {
            Err(QuizfixCliError::FilesSkipped(report.skipped.len()))
        };
    }

    let outcome = migrate_file(path, &options)?;
    if json {
        print_json(&outcome)?;
    } else {
        println!("{}: {}", path.display(), describe_outcome(&outcome));
    }
    Ok(())
}

fn describe_outcome(outcome: &MigrateOutcome) -> String {
    match outcome {
        MigrateOutcome::AlreadyFlat => "already flat".to_string(),
        MigrateOutcome::Migrated {
            dataset_name,
            dataset_type,
            logs,
        } => format!(
            "migrated -> {dataset_name} ({}, {logs} logs)",
            dataset_type.as_str()
        ),
    }
}

fn cmd_merge(inputs: &[PathBuf], output: &Path, json: bool) -> Result<(), QuizfixCliError> {
    let report = merge_files(inputs, output, Utc::now())?;

    if json {
        print_json(&report)?;
    } else {
        println!("Merged {} file(s) into {}", report.inputs.len(), output.display());
        println!("  Sessions: {}", report.sessions);
        println!("  User ID:  {}", report.user_id);
        print_skipped(&report.skipped);
    }
    Ok(())
}

fn cmd_index(dir: &Path, sessions: bool, json: bool) -> Result<(), QuizfixCliError> {
    let report = regenerate_index(dir, sessions)?;
    info!(dir = %dir.display(), datasets = report.datasets, "rebuilt index");

    if json {
        print_json(&report)?;
    } else {
        println!(
            "Indexed {} dataset(s) in {}",
            report.datasets,
            dir.display()
        );
        if sessions {
            println!("  Sessions: {}", report.sessions);
        }
        print_skipped(&report.skipped);
    }
    Ok(())
}

fn cmd_verify(input: &Path, json: bool) -> Result<(), QuizfixCliError> {
    let report = verify_file(input)?;

    if json {
        print_json(&report)?;
    } else {
        let percent = |count: usize| {
            if report.total_logs == 0 {
                0.0
            } else {
                count as f64 / report.total_logs as f64 * 100.0
            }
        };

        println!("Verification Report");
        println!("===================");
        println!("Total logs: {}", report.total_logs);
        println!("All required keys present: {}", report.all_keys_present());
        println!("Correct: {} ({:.1}%)", report.correct, percent(report.correct));
        println!("Error:   {} ({:.1}%)", report.incorrect, percent(report.incorrect));
        println!(
            "With conceptTags: {} (should be {})",
            report.incorrect_with_concept_tags, report.incorrect
        );
        println!(
            "With recommended_terms: {} (should be {})",
            report.incorrect_with_recommended_terms, report.incorrect
        );

        let rt = &report.response_times;
        println!("\nResponse time distribution:");
        println!("  instant (<=2s):     {} ({:.1}%)", rt.instant, percent(rt.instant));
        println!("  searching (2-15s):  {} ({:.1}%)", rt.searching, percent(rt.searching));
        println!("  deliberate (>=15s): {} ({:.1}%)", rt.deliberate, percent(rt.deliberate));
        if rt.unknown > 0 {
            println!("  unknown:            {}", rt.unknown);
        }

        println!("\nPath length distribution:");
        for (length, count) in &report.path_lengths {
            println!("  {length} steps: {count} ({:.1}%)", percent(*count));
        }

        for missing in &report.missing_keys {
            println!("Warning: Log {} - missing {}", missing.log, missing.keys.join(", "));
        }
        for issue in &report.integrity_issues {
            println!("Warning: Log {} - {}", issue.log, issue.message);
        }
        println!(
            "\nIntegrity check: {}",
            if report.integrity_ok() { "OK" } else { "FAILED" }
        );
    }

    if report.passed() {
        Ok(())
    } else {
        Err(QuizfixCliError::VerificationFailed(
            report.missing_keys.len() + report.integrity_issues.len(),
        ))
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), QuizfixCliError> {
    match schema_type {
        SchemaType::Features => {
            let config = FeatureConfig::default();
            println!("Cluster feature vector ({} values in [0, 1])", FEATURE_NAMES.len());
            println!();
            for (i, name) in FEATURE_NAMES.iter().enumerate() {
                println!("  {i}: {name}");
            }
            println!();
            println!("Default normalization:");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        SchemaType::Logs => print_json(&LogGenConfig::default())?,
        SchemaType::Sessions => print_json(&SessionGenConfig::default())?,
        SchemaType::Clusters => print_json(&ClusterGenConfig::default())?,
        SchemaType::Demo => print_json(&DemoGenConfig::default())?,
    }
    Ok(())
}

// Helper functions

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), QuizfixCliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_skipped(skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        return;
    }
    println!("\nSkipped:");
    for file in skipped {
        println!("  - {}: {}", file.file, file.reason);
    }
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, QuizfixCliError> {
    match path {
        Some(path) => Ok(load_typed(path)?),
        None => Ok(T::default()),
    }
}

/// `projects/<id>/quiz.json` names project `<id>`
fn project_from_quiz_path(quiz: &Path) -> Option<String> {
    quiz.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
}

fn parse_base(base: Option<&str>) -> Result<Option<DateTime<Utc>>, QuizfixCliError> {
    base.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| QuizfixCliError::InvalidArgument(format!("--base {s}: {e}")))
    })
    .transpose()
}

// Error types

#[derive(Debug)]
enum QuizfixCliError {
    Fixture(FixtureError),
    Json(serde_json::Error),
    InvalidArgument(String),
    FilesSkipped(usize),
    VerificationFailed(usize),
}

impl From<FixtureError> for QuizfixCliError {
    fn from(e: FixtureError) -> Self {
        QuizfixCliError::Fixture(e)
    }
}

impl From<serde_json::Error> for QuizfixCliError {
    fn from(e: serde_json::Error) -> Self {
        QuizfixCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<QuizfixCliError> for CliError {
    fn from(e: QuizfixCliError) -> Self {
        match e {
            QuizfixCliError::Fixture(e) => fixture_error(e),
            QuizfixCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            QuizfixCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Timestamps use RFC 3339, e.g. 2025-11-20T12:00:00Z".to_string()),
            },
            QuizfixCliError::FilesSkipped(count) => CliError {
                code: "FILES_SKIPPED".to_string(),
                message: format!("{} file(s) could not be processed", count),
                hint: Some("Review the report for the affected files".to_string()),
            },
            QuizfixCliError::VerificationFailed(count) => CliError {
                code: "VERIFICATION_FAILED".to_string(),
                message: format!("{} problem(s) found in the logs", count),
                hint: Some("Regenerate the logs with 'quizfix generate logs'".to_string()),
            },
        }
    }
}

fn fixture_error(e: FixtureError) -> CliError {
    let (code, hint) = match &e {
        FixtureError::IoError(_) | FixtureError::ReadError { .. } | FixtureError::WriteError { .. } => {
            ("IO_ERROR", Some("Check file paths and permissions"))
        }
        FixtureError::JsonError(_) | FixtureError::MalformedDocument { .. } => {
            ("PARSE_ERROR", Some("Check JSON syntax; the file was left unchanged"))
        }
        FixtureError::InvalidShape(_) => (
            "INVALID_SHAPE",
            Some("Expected a dataset with `logs`, `sessions` or `vector_test_sessions`"),
        ),
        FixtureError::InvalidPolicy(_) => (
            "INVALID_POLICY",
            Some("Run 'quizfix schema logs' for a valid configuration"),
        ),
        FixtureError::InvalidConfig(_) => (
            "INVALID_CONFIG",
            Some("Run 'quizfix schema features' for the default configuration"),
        ),
        FixtureError::NothingToMerge(_) => ("NOTHING_TO_MERGE", Some("Check the input files")),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: hint.map(str::to_string),
    }
}

// Report types

#[derive(Serialize)]
struct FileFeatures {
    file: String,
    #[serde(flatten)]
    report: AnnotateReport,
}

#[derive(Serialize)]
struct FeaturesReport {
    files: Vec<FileFeatures>,
    skipped: Vec<SkippedFile>,
}

#[derive(Serialize)]
struct GenerateSummary {
    output: String,
    sessions: usize,
    logs: usize,
    correct: usize,
}
