//! Dataset schema tooling
//!
//! Tolerant parsing of log records plus the declarative document rewrites:
//! legacy-to-flat migration, multi-file session merge and integrity checks
//! for generated logs.

pub mod lenient;
pub mod merge;
pub mod migrate;
pub mod verify;

pub use merge::{merge_files, merge_sources, MergeReport, MergedSessions};
pub use migrate::{migrate_dir, migrate_document, migrate_file, MigrateOptions, MigrateOutcome};
pub use verify::{verify_document, verify_file, verify_logs, VerifyReport};
