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

//! Core error definitions for the CSV exporter.
//!
//! This module provides a centralized `ExportError` enum and a `Result` type
//! used throughout the application. The variants follow the failure taxonomy
//! of an export run:
//!
//! - `ConfigError`: contradictory targets or unreadable SQL source. Fatal,
//!   raised before any database work.
//! - `ResolutionError`: a named schema or table cannot be found. Recorded
//!   against that target only.
//! - `QueryError`: statement execution or fetch failure.
//! - `SinkError`: the output directory, file or stream cannot be written.

use std::io;
use thiserror::Error;

/// Error types encountered during the export process.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot resolve {target}: {reason}")]
    ResolutionError { target: String, reason: String },

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Cannot write to {sink}: {source}")]
    SinkError {
        sink: String,
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    pub fn resolution(target: impl Into<String>, reason: impl ToString) -> Self {
        ExportError::ResolutionError {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    pub fn sink(sink: impl Into<String>, source: io::Error) -> Self {
        ExportError::SinkError {
            sink: sink.into(),
            source,
        }
    }

    /// `true` for failures that must stop the run before any job starts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportError::ConfigError(_))
    }
}

impl From<oracle::Error> for ExportError {
    fn from(e: oracle::Error) -> Self {
        ExportError::QueryError(e.to_string())
    }
}

/// A specialized Result type for the CSV exporter.
pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_target() {
        let e = ExportError::resolution("S.T2", "table not found");
        assert_eq!(e.to_string(), "Cannot resolve S.T2: table not found");

        let e = ExportError::sink(
            "out/S.T1.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(e.to_string(), "Cannot write to out/S.T1.csv: denied");
    }

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(ExportError::ConfigError("x".into()).is_fatal());
        assert!(!ExportError::QueryError("x".into()).is_fatal());
        assert!(!ExportError::resolution("T", "x").is_fatal());
    }
}
