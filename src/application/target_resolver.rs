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

//! # Target Resolver
//!
//! Expands what the user asked for (schemas, tables, a table-list file, or
//! literal SQL) into an ordered plan of export jobs.
//!
//! - **Schema / table targets** become one `SELECT *` job per table, written
//!   to `<output_dir>/<SCHEMA>.<TABLE>.csv`.
//! - **SQL targets** become exactly one job written to standard output.
//!
//! A schema or table that cannot be found does not stop resolution: it
//! stays in the plan as `PlannedJob::Unresolved` so the orchestrator can
//! report it. Contradictory options or an unreadable SQL/table-list source
//! abort with `ConfigError` before the catalog is consulted.

use crate::domain::entities::{
    ExportJob, ExportOptions, PlannedJob, Sink, SqlSource, TargetSpec,
};
use crate::domain::errors::{ExportError, Result};
use crate::domain::table_ref::{normalize_identifier, split_parts, QualifiedTable, TableRef};
use crate::ports::metadata_port::MetadataPort;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Target name used for literal SQL jobs in logs and reports.
pub const SQL_TARGET: &str = "SQL";

/// An exclusion entry: `COL`, `TABLE.COL` or `SCHEMA.TABLE.COL`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExclusionRule {
    schema: Option<String>,
    table: Option<String>,
    column: String,
}

impl ExclusionRule {
    fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<String> = split_parts(raw.trim())
            .into_iter()
            .map(|p| normalize_identifier(p).to_uppercase())
            .collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ExportError::ConfigError(format!(
                "invalid column exclusion '{}'",
                raw
            )));
        }
        match parts.as_slice() {
            [column] => Ok(Self {
                schema: None,
                table: None,
                column: column.clone(),
            }),
            [table, column] => Ok(Self {
                schema: None,
                table: Some(table.clone()),
                column: column.clone(),
            }),
            [schema, table, column] => Ok(Self {
                schema: Some(schema.clone()),
                table: Some(table.clone()),
                column: column.clone(),
            }),
            _ => Err(ExportError::ConfigError(format!(
                "invalid column exclusion '{}': expected COLUMN, TABLE.COLUMN or SCHEMA.TABLE.COLUMN",
                raw
            ))),
        }
    }

    /// Unqualified rules apply everywhere; qualified ones only to their table.
    fn applies_to(&self, table: Option<&QualifiedTable>) -> bool {
        match (&self.table, table) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(rule_table), Some(t)) => {
                *rule_table == t.table.to_uppercase()
                    && self
                        .schema
                        .as_ref()
                        .map_or(true, |s| *s == t.schema.to_uppercase())
            }
        }
    }
}

pub struct TargetResolver<'a> {
    metadata: &'a dyn MetadataPort,
    options: &'a ExportOptions,
}

impl<'a> TargetResolver<'a> {
    pub fn new(metadata: &'a dyn MetadataPort, options: &'a ExportOptions) -> Self {
        Self { metadata, options }
    }

    /// Produces the ordered job plan for `spec`.
    ///
    /// Only configuration problems are returned as `Err`; lookup failures
    /// are kept in the plan as unresolved entries.
    pub fn resolve(&self, spec: &TargetSpec) -> Result<Vec<PlannedJob>> {
        let rules = self
            .options
            .exclude_columns
            .iter()
            .map(|raw| ExclusionRule::parse(raw))
            .collect::<Result<Vec<_>>>()?;

        let plan = match spec {
            TargetSpec::Schemas(schemas) => self.resolve_schemas(schemas, &rules),
            TargetSpec::Tables(tables) => self.resolve_tables(tables, &rules),
            TargetSpec::TableListFile(path) => {
                let tables = read_table_list(path)?;
                self.resolve_tables(&tables, &rules)
            }
            TargetSpec::Sql(text) => vec![PlannedJob::Ready(self.sql_job(text, &rules)?)],
            TargetSpec::SqlFile(source) => {
                let text = read_sql_source(source)?;
                vec![PlannedJob::Ready(self.sql_job(&text, &rules)?)]
            }
        };

        let ready = plan
            .iter()
            .filter(|p| matches!(p, PlannedJob::Ready(_)))
            .count();
        info!(
            "Resolved {} export job(s), {} unresolved target(s)",
            ready,
            plan.len() - ready
        );
        Ok(plan)
    }

    fn resolve_schemas(&self, schemas: &[String], rules: &[ExclusionRule]) -> Vec<PlannedJob> {
        let mut plan = Vec::new();
        for raw in schemas {
            let schema = normalize_identifier(raw);
            match self.metadata.schema_exists(&schema) {
                Ok(true) => {}
                Ok(false) => {
                    plan.push(unresolved(&schema, "schema does not exist or is not visible"));
                    continue;
                }
                Err(e) => {
                    plan.push(unresolved(&schema, e));
                    continue;
                }
            }

            let tables = match self.metadata.get_tables(&schema) {
                Ok(tables) => tables,
                Err(e) => {
                    plan.push(unresolved(&schema, e));
                    continue;
                }
            };
            if tables.is_empty() {
                warn!("Schema {} has no exportable tables", schema);
            }
            debug!("Schema {}: {} table(s)", schema, tables.len());

            for table in tables {
                plan.push(self.table_job(QualifiedTable::new(schema.clone(), table), rules));
            }
        }
        plan
    }

    fn resolve_tables(&self, tokens: &[String], rules: &[ExclusionRule]) -> Vec<PlannedJob> {
        let mut current_schema: Option<String> = None;
        let mut plan = Vec::new();

        for token in tokens {
            let table_ref = match TableRef::parse(token) {
                Ok(t) => t,
                Err(error) => {
                    plan.push(PlannedJob::Unresolved {
                        target: token.trim().to_string(),
                        error,
                    });
                    continue;
                }
            };

            let qualified = match &table_ref.schema {
                Some(_) => table_ref.qualify(""),
                None => {
                    if current_schema.is_none() {
                        match self.metadata.current_schema() {
                            Ok(s) => current_schema = Some(s),
                            Err(e) => {
                                plan.push(unresolved(&table_ref.table, e));
                                continue;
                            }
                        }
                    }
                    table_ref.qualify(current_schema.as_deref().unwrap_or_default())
                }
            };
            plan.push(self.table_job(qualified, rules));
        }
        plan
    }

    fn table_job(&self, table: QualifiedTable, rules: &[ExclusionRule]) -> PlannedJob {
        match self.metadata.table_exists(&table.schema, &table.table) {
            Ok(true) => {}
            Ok(false) => {
                return unresolved(
                    &table.to_string(),
                    "table or view does not exist or is not accessible",
                )
            }
            Err(e) => return unresolved(&table.to_string(), e),
        }
        let file_name = match table.file_name() {
            Ok(name) => name,
            Err(error) => {
                warn!("{}", error);
                return PlannedJob::Unresolved {
                    target: table.to_string(),
                    error,
                };
            }
        };

        PlannedJob::Ready(ExportJob {
            target: table.to_string(),
            statement: table.select_all(),
            sink: Sink::File(self.options.output_dir.join(file_name)),
            exclude_columns: exclusions_for(rules, Some(&table)),
            null_as: self.options.null_as.clone(),
            line_ending: self.options.line_ending,
            emit_header: self.options.emit_header,
            fetch_batch_size: self.options.fetch_batch_size,
            point_in_time: self.options.point_in_time,
        })
    }

    fn sql_job(&self, text: &str, rules: &[ExclusionRule]) -> Result<ExportJob> {
        Ok(ExportJob {
            target: SQL_TARGET.to_string(),
            statement: clean_statement(text)?,
            sink: Sink::Stdout,
            exclude_columns: exclusions_for(rules, None),
            null_as: self.options.null_as.clone(),
            line_ending: self.options.line_ending,
            emit_header: self.options.emit_header,
            fetch_batch_size: self.options.fetch_batch_size,
            // An arbitrary statement cannot take a trailing AS OF clause.
            point_in_time: None,
        })
    }
}

fn unresolved(target: &str, reason: impl ToString) -> PlannedJob {
    let error = ExportError::resolution(target, reason);
    warn!("{}", error);
    PlannedJob::Unresolved {
        target: target.to_string(),
        error,
    }
}

fn exclusions_for(rules: &[ExclusionRule], table: Option<&QualifiedTable>) -> HashSet<String> {
    rules
        .iter()
        .filter(|r| r.applies_to(table))
        .map(|r| r.column.clone())
        .collect()
}

/// Trims whitespace and trailing semicolons. Empty text is a config error.
pub fn clean_statement(text: &str) -> Result<String> {
    let stmt = text.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if stmt.is_empty() {
        return Err(ExportError::ConfigError("SQL statement is empty".to_string()));
    }
    Ok(stmt.to_string())
}

fn read_sql_source(source: &SqlSource) -> Result<String> {
    match source {
        SqlSource::Stdin => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(|e| {
                ExportError::ConfigError(format!("cannot read SQL from standard input: {}", e))
            })?;
            Ok(text)
        }
        SqlSource::File(path) => fs::read_to_string(path).map_err(|e| {
            ExportError::ConfigError(format!("cannot read SQL file {}: {}", path.display(), e))
        }),
    }
}

/// One table per line; blank lines are skipped.
fn read_table_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        ExportError::ConfigError(format!("cannot read table list {}: {}", path.display(), e))
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
