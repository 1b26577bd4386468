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

//! JSON run report: a summary block plus one entry per job, in plan order.

use crate::domain::entities::{JobStatus, RunSummary};
use crate::domain::errors::{ExportError, Result};
use chrono::{DateTime, Local};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn build_report(summary: &RunSummary, started_at: DateTime<Local>) -> serde_json::Value {
    let success = summary
        .results
        .iter()
        .filter(|r| r.status == JobStatus::Success)
        .count();
    let total_rows: u64 = summary.results.iter().map(|r| r.rows).sum();
    let total_bytes: u64 = summary.results.iter().map(|r| r.bytes).sum();

    json!({
        "summary": {
            "started_at": started_at.to_rfc3339(),
            "total_jobs": summary.results.len(),
            "success": success,
            "failed": summary.results.len() - success,
            "failed_targets": summary.failed_targets(),
            "total_rows": total_rows,
            "total_bytes": total_bytes,
            "total_duration_seconds": summary.duration,
        },
        "details": summary.results,
    })
}

pub fn write_report(summary: &RunSummary, started_at: DateTime<Local>, path: &Path) -> Result<()> {
    let sink_name = path.display().to_string();
    let sink_err = |e: io::Error| ExportError::sink(&sink_name, e);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(sink_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(sink_err)?);
    serde_json::to_writer_pretty(&mut writer, &build_report(summary, started_at))
        .map_err(|e| sink_err(e.into()))?;
    writer.flush().map_err(sink_err)
}
