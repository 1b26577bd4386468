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

//! # Row Source
//!
//! Runs one statement through the extraction port and hands out its rows
//! lazily, one fetched batch at a time. Excluded columns are dropped here,
//! before anything downstream sees the column list or a row, so the header
//! and every row always have `column_count - excluded_count` fields.
//!
//! The batch size only changes how many rows travel per round-trip; row
//! order and content are whatever the server returns.

use crate::domain::entities::{ColumnDescriptor, Row};
use crate::domain::errors::{ExportError, Result};
use crate::ports::extraction_port::{ExtractionPort, RowCursor};
use log::debug;
use std::collections::HashSet;
use std::vec;

pub struct RowSource<'a> {
    cursor: Box<dyn RowCursor + 'a>,
    columns: Vec<ColumnDescriptor>,
    /// One flag per driver column: `true` if it survives exclusion.
    keep: Vec<bool>,
    pending: vec::IntoIter<Row>,
    batches: u64,
    rows_fetched: u64,
    drained: bool,
}

impl<'a> RowSource<'a> {
    /// Executes `statement` and computes the post-exclusion column list.
    ///
    /// `exclude` holds upper-cased column names; matching is case-insensitive.
    pub fn open(
        port: &'a dyn ExtractionPort,
        statement: &str,
        point_in_time: Option<u64>,
        batch_size: usize,
        exclude: &HashSet<String>,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(ExportError::ConfigError(
                "fetch batch size must be a positive integer".to_string(),
            ));
        }

        let cursor = port.execute(statement, point_in_time, batch_size)?;
        let keep: Vec<bool> = cursor
            .column_names()
            .iter()
            .map(|name| !exclude.contains(&name.to_uppercase()))
            .collect();
        let columns = cursor
            .column_names()
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(name, _)| ColumnDescriptor { name: name.clone() })
            .collect();

        Ok(Self {
            cursor,
            columns,
            keep,
            pending: Vec::new().into_iter(),
            batches: 0,
            rows_fetched: 0,
            drained: false,
        })
    }

    /// Surviving columns, in output order.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows_fetched(&self) -> u64 {
        self.rows_fetched
    }

    /// Fetches the next batch from the server, already projected.
    pub fn next_batch(&mut self) -> Result<Option<Vec<Row>>> {
        if self.drained {
            return Ok(None);
        }
        let Some(batch) = self.cursor.next_batch()? else {
            self.drained = true;
            return Ok(None);
        };

        self.batches += 1;
        self.rows_fetched += batch.len() as u64;
        debug!(
            "Fetched batch {} ({} rows, {} total)",
            self.batches,
            batch.len(),
            self.rows_fetched
        );

        batch
            .into_iter()
            .map(|row| self.project(row))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn project(&self, row: Row) -> Result<Row> {
        if row.len() != self.keep.len() {
            return Err(ExportError::QueryError(format!(
                "driver returned {} values for {} columns",
                row.len(),
                self.keep.len()
            )));
        }
        if self.columns.len() == self.keep.len() {
            return Ok(row);
        }
        Ok(row
            .into_iter()
            .zip(&self.keep)
            .filter_map(|(value, kept)| kept.then_some(value))
            .collect())
    }
}

/// Row-at-a-time view over the batches. A fetch error ends the sequence.
impl Iterator for RowSource<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.next() {
                return Some(Ok(row));
            }
            match self.next_batch() {
                Ok(Some(batch)) => self.pending = batch.into_iter(),
                Ok(None) => return None,
                Err(e) => {
                    self.drained = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
