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

//! # Export Orchestrator
//!
//! Runs the planned jobs strictly in order on the one shared session:
//! open the sink, execute the statement, stream header and rows through the
//! CSV serializer, then close (file) or flush (stdout) the sink.
//!
//! ## Failure isolation
//! Every job ends up as a `JobResult`. A failed job (unresolved target,
//! query or sink failure) is recorded and the next job still runs. The one
//! exception is a plan with a single job: there is nothing to fall back to,
//! so its error is returned to the caller instead.

use crate::application::row_source::RowSource;
use crate::domain::csv_format::CsvSerializer;
use crate::domain::entities::{ExportJob, JobResult, PlannedJob, RunSummary, Sink};
use crate::domain::errors::{ExportError, Result};
use crate::ports::extraction_port::ExtractionPort;
use log::{info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

const FILE_BUFFER_CAPACITY: usize = 128 * 1024;

/// Counters for one finished job.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobStats {
    pub rows: u64,
    pub bytes: u64,
    pub duration: f64,
}

struct JobOutcome {
    target: String,
    sink: String,
    result: Result<JobStats>,
}

pub struct ExportOrchestrator<'a> {
    extraction_port: &'a dyn ExtractionPort,
}

impl<'a> ExportOrchestrator<'a> {
    pub fn new(extraction_port: &'a dyn ExtractionPort) -> Self {
        Self { extraction_port }
    }

    /// Processes `plan` in order. `stdout` is the shared stream used by
    /// stream sinks; it is flushed after each such job but never closed.
    pub fn run(&self, plan: Vec<PlannedJob>, stdout: &mut dyn Write) -> Result<RunSummary> {
        let start_time = Instant::now();
        let mut outcomes = Vec::with_capacity(plan.len());

        for planned in plan {
            let outcome = match planned {
                PlannedJob::Ready(job) => {
                    info!("EXPORTING: {}...", job.target);
                    let result = self.export_job(&job, stdout);
                    if let Err(e) = &result {
                        warn!("{} failed: {}", job.target, e);
                    }
                    JobOutcome {
                        target: job.target,
                        sink: job.sink.to_string(),
                        result,
                    }
                }
                PlannedJob::Unresolved { target, error } => JobOutcome {
                    target,
                    sink: String::new(),
                    result: Err(error),
                },
            };
            outcomes.push(outcome);
        }

        if outcomes.len() == 1 && outcomes[0].result.is_err() {
            if let Some(JobOutcome { result: Err(e), .. }) = outcomes.pop() {
                return Err(e);
            }
        }

        let results = outcomes
            .into_iter()
            .map(|o| match o.result {
                Ok(s) => JobResult::success(o.target, o.sink, s.rows, s.bytes, s.duration),
                Err(e) => JobResult::failure(o.target, o.sink, e.to_string()),
            })
            .collect();

        Ok(RunSummary {
            results,
            duration: start_time.elapsed().as_secs_f64(),
        })
    }

    /// Exports one job end to end.
    pub fn export_job(&self, job: &ExportJob, stdout: &mut dyn Write) -> Result<JobStats> {
        let sink_name = job.sink.to_string();
        match &job.sink {
            Sink::File(path) => {
                let mut writer = open_file_sink(path)?;
                let stats = self.stream_rows(job, &mut writer, &sink_name)?;
                writer.flush().map_err(|e| ExportError::sink(&sink_name, e))?;
                Ok(stats)
            }
            Sink::Stdout => {
                let stats = self.stream_rows(job, stdout, &sink_name)?;
                stdout.flush().map_err(|e| ExportError::sink(&sink_name, e))?;
                Ok(stats)
            }
        }
    }

    fn stream_rows(&self, job: &ExportJob, out: &mut dyn Write, sink_name: &str) -> Result<JobStats> {
        let start_time = Instant::now();
        let source = RowSource::open(
            self.extraction_port,
            &job.statement,
            job.point_in_time,
            job.fetch_batch_size,
            &job.exclude_columns,
        )?;

        let mut serializer = CsvSerializer::new(
            source.columns(),
            job.emit_header,
            &job.null_as,
            job.line_ending,
        );
        let sink_err = |e: io::Error| ExportError::sink(sink_name, e);

        let mut bytes = serializer.write_header(out).map_err(sink_err)? as u64;
        let mut rows = 0u64;
        for row in source {
            bytes += serializer.write_row(out, &row?).map_err(sink_err)? as u64;
            rows += 1;
        }

        let duration = start_time.elapsed().as_secs_f64();
        let rate = if duration > 0.0 { rows as f64 / duration } else { 0.0 };
        info!(
            "exported {} rows in {:.3}s {:.2}rows/s from sql '{}'",
            rows, duration, rate, job.statement
        );

        Ok(JobStats {
            rows,
            bytes,
            duration,
        })
    }
}

/// Creates the parent directory if needed and truncates the file.
fn open_file_sink(path: &Path) -> Result<BufWriter<File>> {
    let sink_name = path.display().to_string();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExportError::sink(&sink_name, e))?;
    }
    let file = File::create(path).map_err(|e| ExportError::sink(&sink_name, e))?;
    Ok(BufWriter::with_capacity(FILE_BUFFER_CAPACITY, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::row_source::tests::MockExtractionPort;
    use crate::domain::entities::{JobStatus, LineEnding, Value};
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn job(target: &str, statement: &str, sink: Sink) -> ExportJob {
        ExportJob {
            target: target.to_string(),
            statement: statement.to_string(),
            sink,
            exclude_columns: HashSet::new(),
            null_as: String::new(),
            line_ending: LineEnding::Lf,
            emit_header: true,
            fetch_batch_size: 16384,
            point_in_time: None,
        }
    }

    fn port() -> MockExtractionPort {
        MockExtractionPort::new(
            &["ID", "NOTE"],
            vec![
                vec![Value::Number("1".into()), Value::Text("a,b".into())],
                vec![Value::Number("2".into()), Value::Null],
            ],
        )
    }

    #[test]
    fn test_single_sql_job_to_stream() {
        let port = MockExtractionPort::new(
            &["A", "B"],
            vec![vec![Value::Number("1".into()), Value::Null]],
        );
        let mut sql = job("SQL", "SELECT 1 AS A, NULL AS B FROM dual", Sink::Stdout);
        sql.null_as = "\\N".to_string();

        let mut out = Vec::new();
        let summary = ExportOrchestrator::new(&port)
            .run(vec![PlannedJob::Ready(sql)], &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "A,B\n1,\\N\n");
        assert!(summary.is_success());
        assert_eq!(summary.results[0].rows, 1);
        assert_eq!(summary.results[0].bytes, 9);
    }

    #[test]
    fn test_crlf_only_changes_terminators() {
        let port = port();
        let mut lf_out = Vec::new();
        let mut crlf_out = Vec::new();
        let orchestrator = ExportOrchestrator::new(&port);

        orchestrator
            .export_job(&job("SQL", "q", Sink::Stdout), &mut lf_out)
            .unwrap();
        let mut crlf = job("SQL", "q", Sink::Stdout);
        crlf.line_ending = LineEnding::CrLf;
        orchestrator.export_job(&crlf, &mut crlf_out).unwrap();

        let lf = String::from_utf8(lf_out).unwrap();
        let crlf = String::from_utf8(crlf_out).unwrap();
        assert_eq!(crlf, "ID,NOTE\r\n1,\"a,b\"\r\n2,\r\n");
        assert_eq!(crlf.replace("\r\n", "\n"), lf);
    }

    #[test]
    fn test_batch_size_gives_identical_output() {
        let port = port();
        let orchestrator = ExportOrchestrator::new(&port);
        let mut small = job("SQL", "q", Sink::Stdout);
        small.fetch_batch_size = 1;
        let large = job("SQL", "q", Sink::Stdout);

        let (mut a, mut b) = (Vec::new(), Vec::new());
        orchestrator.export_job(&small, &mut a).unwrap();
        orchestrator.export_job(&large, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_excluded_column_absent_from_header_and_rows() {
        let port = port();
        let mut j = job("SQL", "q", Sink::Stdout);
        j.exclude_columns.insert("NOTE".to_string());
        let mut out = Vec::new();
        ExportOrchestrator::new(&port).export_job(&j, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ID\n1\n2\n");
    }

    #[test]
    fn test_schema_run_isolates_failed_target() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("exports");
        let port = port();

        let plan = vec![
            PlannedJob::Ready(job(
                "S.T1",
                "SELECT * FROM \"S\".\"T1\"",
                Sink::File(out_dir.join("S.T1.csv")),
            )),
            PlannedJob::Unresolved {
                target: "S.T2".to_string(),
                error: ExportError::resolution("S.T2", "table not found"),
            },
        ];

        let mut stdout = Vec::new();
        let summary = ExportOrchestrator::new(&port).run(plan, &mut stdout).unwrap();

        let content = fs::read_to_string(out_dir.join("S.T1.csv")).unwrap();
        assert_eq!(content, "ID,NOTE\n1,\"a,b\"\n2,\n");
        assert!(stdout.is_empty());
        assert!(!summary.is_success());
        assert_eq!(summary.failed_targets(), vec!["S.T2"]);
        assert_eq!(summary.results[0].status, JobStatus::Success);
        assert!(summary.results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("table not found"));
    }

    #[test]
    fn test_query_failure_does_not_stop_later_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let port = port();
        let plan = vec![
            PlannedJob::Ready(job("S.BAD", "INVALID", Sink::File(dir.path().join("S.BAD.csv")))),
            PlannedJob::Ready(job("S.GOOD", "q", Sink::File(dir.path().join("S.GOOD.csv")))),
        ];

        let summary = ExportOrchestrator::new(&port).run(plan, &mut io::sink()).unwrap();
        assert_eq!(summary.failed_targets(), vec!["S.BAD"]);
        assert!(dir.path().join("S.GOOD.csv").exists());
        assert_eq!(summary.results[1].rows, 2);
    }

    #[test]
    fn test_single_job_failure_propagates() {
        let port = port();
        let plan = vec![PlannedJob::Ready(job("SQL", "INVALID", Sink::Stdout))];
        let err = ExportOrchestrator::new(&port)
            .run(plan, &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, ExportError::QueryError(_)));

        let plan = vec![PlannedJob::Unresolved {
            target: "SCOTT.NOPE".to_string(),
            error: ExportError::resolution("SCOTT.NOPE", "missing"),
        }];
        let err = ExportOrchestrator::new(&port)
            .run(plan, &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, ExportError::ResolutionError { .. }));
    }

    #[test]
    fn test_mid_fetch_failure_aborts_only_that_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut port = port();
        port.fail_after = Some(1);
        let plan = vec![
            PlannedJob::Ready(job("S.T1", "q", Sink::File(dir.path().join("S.T1.csv")))),
            PlannedJob::Ready(job("S.T2", "q", Sink::File(dir.path().join("S.T2.csv")))),
        ];
        let summary = ExportOrchestrator::new(&port).run(plan, &mut io::sink()).unwrap();
        assert_eq!(summary.failed_targets(), vec!["S.T1", "S.T2"]);
        assert_eq!(summary.results.len(), 2);
    }

    #[test]
    fn test_unwritable_sink_is_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();
        let port = port();

        let j = job("S.T1", "q", Sink::File(blocker.join("S.T1.csv")));
        let err = ExportOrchestrator::new(&port)
            .export_job(&j, &mut io::sink())
            .unwrap_err();
        assert!(matches!(err, ExportError::SinkError { .. }));
    }

    #[test]
    fn test_file_sink_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("S.T1.csv");
        fs::write(&path, "stale content that is longer than the export\n".repeat(10)).unwrap();
        let port = port();

        ExportOrchestrator::new(&port)
            .export_job(&job("S.T1", "q", Sink::File(path.clone())), &mut io::sink())
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ID,NOTE\n1,\"a,b\"\n2,\n");
    }
}
