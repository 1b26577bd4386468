// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Domain Entities
//!
//! The "Nouns" of the exporter: what the user asked for (`TargetSpec`), the
//! units of work derived from it (`ExportJob`), the data flowing through a
//! job (`ColumnDescriptor`, `Value`, `Row`) and the report card of a run
//! (`JobResult`, `RunSummary`).

use crate::domain::errors::ExportError;
use chrono::{FixedOffset, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

/// Default number of rows fetched per server round-trip.
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 16384;

/// Line terminator written after every CSV line, including the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// UNIX style (`\n`).
    #[default]
    Lf,
    /// DOS style (`\r\n`).
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Where the serialized CSV of one job goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    /// A file, truncated on open. Parent directory is created if missing.
    File(PathBuf),
    /// The process-wide standard output stream. Flushed, never closed.
    Stdout,
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::File(path) => write!(f, "{}", path.display()),
            Sink::Stdout => write!(f, "<stdout>"),
        }
    }
}

/// Where the text of a literal SQL job comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlSource {
    Stdin,
    File(PathBuf),
}

impl SqlSource {
    /// `-` is the conventional token for standard input.
    pub fn from_token(token: &str) -> Self {
        if token == "-" {
            SqlSource::Stdin
        } else {
            SqlSource::File(PathBuf::from(token))
        }
    }
}

/// What the user asked to export. Exactly one category per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Schemas(Vec<String>),
    Tables(Vec<String>),
    TableListFile(PathBuf),
    Sql(String),
    SqlFile(SqlSource),
}

impl TargetSpec {
    /// Builds the target from the raw selections, rejecting anything but
    /// exactly one populated category.
    pub fn select(
        schemas: Vec<String>,
        tables: Vec<String>,
        table_list: Option<PathBuf>,
        sql: Option<String>,
        sql_file: Option<String>,
    ) -> Result<Self, ExportError> {
        let mut chosen = Vec::new();
        if !schemas.is_empty() {
            chosen.push(TargetSpec::Schemas(schemas));
        }
        if !tables.is_empty() {
            chosen.push(TargetSpec::Tables(tables));
        }
        if let Some(path) = table_list {
            chosen.push(TargetSpec::TableListFile(path));
        }
        if let Some(text) = sql {
            chosen.push(TargetSpec::Sql(text));
        }
        if let Some(token) = sql_file {
            chosen.push(TargetSpec::SqlFile(SqlSource::from_token(&token)));
        }

        match chosen.len() {
            0 => Err(ExportError::ConfigError(
                "one of --schema, --table, --table-list, --sql or --file is required".to_string(),
            )),
            1 => Ok(chosen.remove(0)),
            _ => Err(ExportError::ConfigError(
                "--schema, --table, --table-list, --sql and --file are mutually exclusive"
                    .to_string(),
            )),
        }
    }
}

/// Options shared by every job of a run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub null_as: String,
    pub line_ending: LineEnding,
    pub emit_header: bool,
    pub fetch_batch_size: usize,
    /// System change number for `AS OF SCN` reads of table-derived jobs.
    pub point_in_time: Option<u64>,
    /// Raw exclusion entries: `COL`, `TABLE.COL` or `SCHEMA.TABLE.COL`.
    pub exclude_columns: Vec<String>,
    pub output_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            null_as: String::new(),
            line_ending: LineEnding::Lf,
            emit_header: true,
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
            point_in_time: None,
            exclude_columns: Vec::new(),
            output_dir: PathBuf::from("."),
        }
    }
}

/// One unit of work: one statement, one sink.
///
/// Built by the target resolver and consumed once by the orchestrator.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Name used in logs and failure reports (`SCHEMA.TABLE` or `SQL`).
    pub target: String,
    pub statement: String,
    pub sink: Sink,
    /// Upper-cased names of the columns to drop from header and rows.
    pub exclude_columns: HashSet<String>,
    pub null_as: String,
    pub line_ending: LineEnding,
    pub emit_header: bool,
    pub fetch_batch_size: usize,
    pub point_in_time: Option<u64>,
}

/// A resolver output slot. Unresolved targets keep their place in the
/// plan so the orchestrator can report them in order.
#[derive(Debug)]
pub enum PlannedJob {
    Ready(ExportJob),
    Unresolved { target: String, error: ExportError },
}

impl PlannedJob {
    pub fn target(&self) -> &str {
        match self {
            PlannedJob::Ready(job) => &job.target,
            PlannedJob::Unresolved { target, .. } => target,
        }
    }
}

/// A surviving result column, in result order. `name` is the header text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
}

/// A scalar produced by the database driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    /// Canonical fixed-decimal text as produced by the driver.
    Number(String),
    DateTime {
        value: NaiveDateTime,
        offset: Option<FixedOffset>,
    },
    Binary(Vec<u8>),
}

/// One result row, one value per surviving column.
pub type Row = Vec<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Success,
    Failed,
}

/// `JobResult` is the "Report Card" for an `ExportJob`.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub target: String,
    pub sink: String,
    pub status: JobStatus,
    pub rows: u64,
    pub bytes: u64,
    pub duration: f64,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(target: String, sink: String, rows: u64, bytes: u64, duration: f64) -> Self {
        Self {
            target,
            sink,
            status: JobStatus::Success,
            rows,
            bytes,
            duration,
            error: None,
        }
    }

    pub fn failure(target: String, sink: String, error: String) -> Self {
        Self {
            target,
            sink,
            status: JobStatus::Failed,
            rows: 0,
            bytes: 0,
            duration: 0.0,
            error: Some(error),
        }
    }
}

/// Outcome of a whole run, in plan order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub results: Vec<JobResult>,
    pub duration: f64,
}

impl RunSummary {
    pub fn failed_targets(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.status == JobStatus::Failed)
            .map(|r| r.target.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.status == JobStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> (Vec<String>, Vec<String>, Option<PathBuf>, Option<String>, Option<String>) {
        (vec![], vec![], None, None, None)
    }

    #[test]
    fn test_select_single_category() {
        let (s, _, l, q, f) = none();
        let spec = TargetSpec::select(s, vec!["EMP".into()], l, q, f).unwrap();
        assert_eq!(spec, TargetSpec::Tables(vec!["EMP".into()]));

        let (s, t, l, q, _) = none();
        let spec = TargetSpec::select(s, t, l, q, Some("-".into())).unwrap();
        assert_eq!(spec, TargetSpec::SqlFile(SqlSource::Stdin));
    }

    #[test]
    fn test_select_rejects_mixed_categories() {
        let (_, t, l, _, f) = none();
        let err = TargetSpec::select(vec!["HR".into()], t, l, Some("select 1".into()), f)
            .unwrap_err();
        assert!(matches!(err, ExportError::ConfigError(_)));
    }

    #[test]
    fn test_select_requires_a_target() {
        let (s, t, l, q, f) = none();
        assert!(matches!(
            TargetSpec::select(s, t, l, q, f),
            Err(ExportError::ConfigError(_))
        ));
    }

    #[test]
    fn test_run_summary_failures() {
        let summary = RunSummary {
            results: vec![
                JobResult::success("S.T1".into(), "S.T1.csv".into(), 3, 30, 0.1),
                JobResult::failure("S.T2".into(), "S.T2.csv".into(), "boom".into()),
            ],
            duration: 0.2,
        };
        assert!(!summary.is_success());
        assert_eq!(summary.failed_targets(), vec!["S.T2"]);
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(LineEnding::default().as_str(), "\n");
        assert_eq!(LineEnding::CrLf.as_str(), "\r\n");
    }
}
