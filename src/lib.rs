//! Quizlog Fixtures - synthetic quiz-session data for student analytics
//!
//! Generates, migrates and validates the JSON fixtures consumed by a
//! student-analytics application: per-question logs, multi-session datasets
//! and the 8-dimensional cluster feature vectors derived from them.
//!
//! ## Modules
//!
//! - **Features**: reduce a session's logs to a normalized feature vector
//! - **Pipeline**: attach feature vectors to every session of a dataset file
//! - **Generator**: seeded, configuration-driven fixture generation
//! - **Schema**: tolerant parsing, migration, merging and verification
//! - **Index**: maintain the `index.json` listing of dataset files

pub mod error;
pub mod features;
pub mod generator;
pub mod index;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod types;

pub use error::FixtureError;
pub use features::{FeatureConfig, FeatureReducer, FEATURE_NAMES};
pub use normalizer::AxisRange;
pub use pipeline::{annotate_document, annotate_json, backfill_document, FeatureProcessor};
pub use types::{FeatureVector, LogRecord, Session, FEATURE_COUNT};

/// Crate version reported by the CLI
pub const FIXTURES_VERSION: &str = env!("CARGO_PKG_VERSION");
