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

//! Parsing of user-supplied table tokens (`TABLE` or `SCHEMA.TABLE`).
//!
//! Unquoted parts follow the Oracle dictionary convention and are
//! upper-cased. Parts wrapped in double quotes keep their case.

use crate::domain::errors::{ExportError, Result};
use std::fmt;

/// A table name, optionally qualified by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

/// A table whose owner is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTable {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn parse(token: &str) -> Result<Self> {
        let parts = split_parts(token.trim());
        match parts.as_slice() {
            [table] if !table.is_empty() => Ok(Self {
                schema: None,
                table: normalize_identifier(table),
            }),
            [schema, table] if !schema.is_empty() && !table.is_empty() => Ok(Self {
                schema: Some(normalize_identifier(schema)),
                table: normalize_identifier(table),
            }),
            _ => Err(ExportError::resolution(
                token,
                "expected TABLE or SCHEMA.TABLE",
            )),
        }
    }

    pub fn qualify(self, default_schema: &str) -> QualifiedTable {
        QualifiedTable {
            schema: self.schema.unwrap_or_else(|| default_schema.to_string()),
            table: self.table,
        }
    }
}

impl QualifiedTable {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// `SELECT *` with both identifiers quoted. No ordering is imposed.
    pub fn select_all(&self) -> String {
        format!(
            "SELECT * FROM {}.{}",
            quote_identifier(&self.schema),
            quote_identifier(&self.table)
        )
    }

    /// `SCHEMA.TABLE.csv`. Names that would escape the output directory
    /// are rejected.
    pub fn file_name(&self) -> Result<String> {
        if [&self.schema, &self.table]
            .iter()
            .any(|part| part.contains(['/', '\\', '\0']))
        {
            return Err(ExportError::resolution(
                self.to_string(),
                "name contains a path separator and cannot be used as a file name",
            ));
        }
        Ok(format!("{}.{}.csv", self.schema, self.table))
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Upper-cases a bare identifier, or strips the quotes of a quoted one.
pub fn normalize_identifier(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        raw[1..raw.len() - 1].replace("\"\"", "\"")
    } else {
        raw.to_uppercase()
    }
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Splits on dots that are not inside a quoted part.
pub fn split_parts(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in token.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(&token[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&token[start..]);
    parts
}
