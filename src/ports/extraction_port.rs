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

//! # Extraction Port
//!
//! The database driver boundary used by the row source: execute one
//! statement, get its column names right away, then pull rows in batches.

use crate::domain::entities::Row;
use crate::domain::errors::Result;

/// An executed statement whose rows have not all been fetched yet.
pub trait RowCursor {
    /// Result column names in select-list order. Available before any fetch.
    fn column_names(&self) -> &[String];

    /// Fetches up to one batch of rows. `None` once the cursor is drained.
    fn next_batch(&mut self) -> Result<Option<Vec<Row>>>;
}

pub trait ExtractionPort {
    /// Executes `statement`, optionally as of a past system change number,
    /// fetching `batch_size` rows per round-trip.
    fn execute<'a>(
        &'a self,
        statement: &str,
        point_in_time: Option<u64>,
        batch_size: usize,
    ) -> Result<Box<dyn RowCursor + 'a>>;
}
