//! Integrity checks for generated flat logs

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::FixtureError;
use crate::store::load_json;
use crate::types::LogRecord;

/// Keys every generated flat log must carry
pub const REQUIRED_LOG_KEYS: [&str; 7] = [
    "questionId",
    "clicks",
    "path",
    "final_answer",
    "correct",
    "response_time",
    "timestamp",
];

/// Response-time bands used when reporting generated logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTimeCategory {
    /// `<= 2` seconds
    Instant,
    /// Between 2 and 15 seconds
    Searching,
    /// `>= 15` seconds
    Deliberate,
}

impl ResponseTimeCategory {
    pub fn classify(seconds: f64) -> Self {
        if seconds <= 2.0 {
            Self::Instant
        } else if seconds < 15.0 {
            Self::Searching
        } else {
            Self::Deliberate
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseTimeBreakdown {
    pub instant: usize,
    pub searching: usize,
    pub deliberate: usize,
    /// Logs without a usable `response_time`
    pub unknown: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingKeys {
    pub log: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    pub log: usize,
    pub message: String,
}

/// Summary of a verification run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub total_logs: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub incorrect_with_concept_tags: usize,
    pub incorrect_with_recommended_terms: usize,
    pub response_times: ResponseTimeBreakdown,
    /// Number of logs per path length
    pub path_lengths: BTreeMap<usize, usize>,
    pub missing_keys: Vec<MissingKeys>,
    pub integrity_issues: Vec<IntegrityIssue>,
}

impl VerifyReport {
    pub fn all_keys_present(&self) -> bool {
        self.missing_keys.is_empty()
    }

    pub fn integrity_ok(&self) -> bool {
        self.integrity_issues.is_empty()
    }

    /// Every incorrect log carries concept tags and recommended terms
    pub fn annotations_complete(&self) -> bool {
        self.incorrect_with_concept_tags == self.incorrect
            && self.incorrect_with_recommended_terms == self.incorrect
    }

    pub fn passed(&self) -> bool {
        self.all_keys_present() && self.integrity_ok()
    }
}

/// Check a list of raw log values
pub fn verify_logs(logs: &[Value]) -> VerifyReport {
    let mut report = VerifyReport {
        total_logs: logs.len(),
        ..VerifyReport::default()
    };

    for (i, raw) in logs.iter().enumerate() {
        let Some(obj) = raw.as_object() else {
            report.integrity_issues.push(IntegrityIssue {
                log: i,
                message: "log entry is not an object".to_string(),
            });
            continue;
        };

        let missing: Vec<String> = REQUIRED_LOG_KEYS
            .iter()
            .filter(|key| !obj.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            report.missing_keys.push(MissingKeys { log: i, keys: missing });
        }

        let log: LogRecord = match serde_json::from_value(raw.clone()) {
            Ok(log) => log,
            Err(e) => {
                report.integrity_issues.push(IntegrityIssue {
                    log: i,
                    message: format!("unreadable log: {e}"),
                });
                continue;
            }
        };

        if log.correct {
            report.correct += 1;
        } else {
            report.incorrect += 1;
            if obj.contains_key("conceptTags") {
                report.incorrect_with_concept_tags += 1;
            }
            if obj.contains_key("recommended_terms") {
                report.incorrect_with_recommended_terms += 1;
            }
        }

        match log.response_time.map(ResponseTimeCategory::classify) {
            Some(ResponseTimeCategory::Instant) => report.response_times.instant += 1,
            Some(ResponseTimeCategory::Searching) => report.response_times.searching += 1,
            Some(ResponseTimeCategory::Deliberate) => report.response_times.deliberate += 1,
            None => report.response_times.unknown += 1,
        }
        *report.path_lengths.entry(log.path.len()).or_default() += 1;

        for message in integrity_problems(&log) {
            report.integrity_issues.push(IntegrityIssue { log: i, message });
        }
    }

    report
}

fn integrity_problems(log: &LogRecord) -> Vec<String> {
    let mut problems = Vec::new();

    if log.path.len() != log.clicks.len() {
        problems.push(format!(
            "path length ({}) != clicks length ({})",
            log.path.len(),
            log.clicks.len()
        ));
    }
    for (j, (choice, click)) in log.path.iter().zip(&log.clicks).enumerate() {
        if choice != &click.choice_id {
            problems.push(format!(
                "click {j}: path choice ({choice}) != click choiceId ({})",
                click.choice_id
            ));
        }
    }
    if log.clicks.windows(2).any(|w| w[1].time < w[0].time) {
        problems.push("click times decrease".to_string());
    }
    if let (Some(last), Some(response_time)) = (log.clicks.last(), log.response_time) {
        if (last.time - response_time).abs() > 1e-9 {
            problems.push(format!(
                "last click time ({}) != response_time ({response_time})",
                last.time
            ));
        }
    }
    if let (Some(answer), Some(last)) = (&log.final_answer, log.path.last()) {
        if answer != last {
            problems.push(format!("final_answer ({answer}) is not the last path choice ({last})"));
        }
    }

    problems
}

/// Check the flat `logs` of a dataset document
pub fn verify_document(doc: &Value) -> Result<VerifyReport, FixtureError> {
    match doc.get("logs") {
        Some(Value::Array(logs)) => Ok(verify_logs(logs)),
        _ => Err(FixtureError::InvalidShape(
            "document has no `logs` array".to_string(),
        )),
    }
}

pub fn verify_file(path: &Path) -> Result<VerifyReport, FixtureError> {
    verify_document(&load_json(path)?)
}
