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

//! # Configuration
//!
//! Settings come from two places, merged in this order:
//! 1. An optional config file (`--config`, YAML or JSON).
//! 2. Command-line flags, which override the file.
//!
//! The password falls back to the `ORACLE_PASSWORD` environment variable
//! when neither the logon string nor the file provides one.

use crate::domain::entities::{ExportOptions, LineEnding, TargetSpec, DEFAULT_FETCH_BATCH_SIZE};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::oracle::session::Credentials;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const PASSWORD_ENV: &str = "ORACLE_PASSWORD";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub service: Option<String>,
    /// Full connect identifier; wins over host/port/service.
    pub connection_string: Option<String>,
    pub external_auth: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: Option<String>,
    pub null_as: Option<String>,
    pub fetch_batch_size: Option<usize>,
    pub header: Option<bool>,
    pub crlf: Option<bool>,
    pub exclude_columns: Option<Vec<String>>,
    pub scn: Option<u64>,
    pub report: Option<String>,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Export Oracle schemas, tables or queries as CSV", long_about = None)]
pub struct CliArgs {
    /// {<username>[/<password>][@<connect_identifier>] | / }
    pub logon: Option<String>,

    /// Schema to export, one file per table. Repeatable.
    #[arg(short = 's', long = "schema", value_name = "SCHEMA")]
    pub schemas: Vec<String>,

    /// Table to export (TABLE or SCHEMA.TABLE). Repeatable.
    #[arg(short = 't', long = "table", value_name = "TABLE")]
    pub tables: Vec<String>,

    /// File listing one table per line.
    #[arg(short = 'l', long = "table-list", value_name = "FILENAME")]
    pub table_list: Option<PathBuf>,

    /// SQL statement to export; output goes to STDOUT.
    #[arg(long)]
    pub sql: Option<String>,

    /// File to read the SQL statement from; '-' reads STDIN.
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<String>,

    /// Directory for table exports (default: current directory).
    #[arg(short = 'p', long = "output-path", value_name = "DIR")]
    pub output_path: Option<String>,

    /// Column to exclude (COL, TABLE.COL or SCHEMA.TABLE.COL). Repeatable.
    #[arg(short = 'x', long = "exclude-column", value_name = "COLUMN")]
    pub exclude: Vec<String>,

    /// Export table data AS OF this system change number.
    #[arg(long)]
    pub scn: Option<u64>,

    /// Text written for NULL values (default: empty). Use '\N' for MySQL.
    #[arg(long = "null-as", value_name = "NULL_AS")]
    pub null_as: Option<String>,

    /// Rows fetched per round-trip (default: 16384).
    #[arg(long = "array-size")]
    pub array_size: Option<usize>,

    /// Omit the header row with column names.
    #[arg(long)]
    pub no_header: bool,

    /// Use DOS line endings (\r\n) instead of UNIX (\n).
    #[arg(long)]
    pub crlf: bool,

    /// Path to configuration file (YAML or JSON).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Write a JSON run report to this path.
    #[arg(long, value_name = "FILE")]
    pub report: Option<String>,
}

impl CliArgs {
    /// The single export target selected on the command line.
    pub fn target_spec(&self) -> Result<TargetSpec> {
        TargetSpec::select(
            self.schemas.clone(),
            self.tables.clone(),
            self.table_list.clone(),
            self.sql.clone(),
            self.file.clone(),
        )
    }
}

/// The parts of a `user/password@connect` logon string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Logon {
    pub username: String,
    pub password: Option<String>,
    pub connect_string: Option<String>,
    pub external_auth: bool,
}

impl Logon {
    pub fn parse(raw: &str) -> Self {
        let (credentials, connect) = match raw.split_once('@') {
            Some((c, db)) => (c, Some(db.to_string()).filter(|s| !s.is_empty())),
            None => (raw, None),
        };
        if credentials == "/" {
            return Self {
                connect_string: connect,
                external_auth: true,
                ..Default::default()
            };
        }
        let (username, password) = match credentials.split_once('/') {
            Some((u, p)) => (u.to_string(), Some(p.to_string())),
            None => (credentials.to_string(), None),
        };
        Self {
            username,
            password,
            connect_string: connect,
            external_auth: false,
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ExportError::ConfigError(format!("cannot read {}: {}", path, e)))?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    /// Loads the file named by `--config` (if any), applies CLI overrides
    /// and validates the result.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_cli(args);
        config.validate()?;
        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(raw) = &args.logon {
            let logon = Logon::parse(raw);
            self.database.username = logon.username;
            self.database.external_auth = logon.external_auth;
            if logon.password.is_some() {
                self.database.password = logon.password;
            }
            if logon.connect_string.is_some() {
                self.database.connection_string = logon.connect_string;
            }
        }
        if let Some(o) = &args.output_path { self.export.output_dir = Some(o.clone()); }
        if let Some(n) = &args.null_as { self.export.null_as = Some(n.clone()); }
        if let Some(a) = args.array_size { self.export.fetch_batch_size = Some(a); }
        if args.no_header { self.export.header = Some(false); }
        if args.crlf { self.export.crlf = Some(true); }
        if let Some(s) = args.scn { self.export.scn = Some(s); }
        if let Some(r) = &args.report { self.export.report = Some(r.clone()); }
        if !args.exclude.is_empty() {
            self.export
                .exclude_columns
                .get_or_insert_with(Vec::new)
                .extend(args.exclude.iter().cloned());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.database.external_auth && self.database.username.is_empty() {
            return Err(ExportError::ConfigError(
                "no username given (logon argument or database.username)".to_string(),
            ));
        }
        if self.export.fetch_batch_size == Some(0) {
            return Err(ExportError::ConfigError(
                "array size must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn export_options(&self) -> ExportOptions {
        let export = &self.export;
        ExportOptions {
            null_as: export.null_as.clone().unwrap_or_default(),
            line_ending: if export.crlf.unwrap_or(false) {
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            },
            emit_header: export.header.unwrap_or(true),
            fetch_batch_size: export.fetch_batch_size.unwrap_or(DEFAULT_FETCH_BATCH_SIZE),
            point_in_time: export.scn,
            exclude_columns: export.exclude_columns.clone().unwrap_or_default(),
            output_dir: PathBuf::from(export.output_dir.as_deref().unwrap_or(".")),
        }
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.export.report.as_ref().map(PathBuf::from)
    }
}

impl DatabaseConfig {
    pub fn get_connection_string(&self) -> String {
        if let Some(cs) = &self.connection_string {
            return cs.clone();
        }
        match (&self.host, &self.service) {
            (Some(host), Some(service)) => {
                format!("//{}:{}/{}", host, self.port.unwrap_or(1521), service)
            }
            _ => String::new(),
        }
    }

    /// Logon/file password first, then the environment.
    pub fn credentials(&self) -> Credentials {
        let password = if self.external_auth {
            String::new()
        } else {
            self.password
                .clone()
                .or_else(|| std::env::var(PASSWORD_ENV).ok())
                .unwrap_or_default()
        };
        Credentials {
            username: self.username.clone(),
            password,
            connect_string: self.get_connection_string(),
            external_auth: self.external_auth,
        }
    }
}
