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

//! # Metadata Port
//!
//! This Port defines what the target resolver needs to know about the
//! database catalog. It doesn't care IF the database is Oracle or a mock
//! for testing; any struct implementing `MetadataPort` can feed the resolver.

use crate::domain::errors::Result;

pub trait MetadataPort {
    /// Schema that unqualified table names belong to (the logged-in user
    /// unless the session changed it).
    fn current_schema(&self) -> Result<String>;

    /// Whether a user/schema with this exact name exists.
    fn schema_exists(&self, schema: &str) -> Result<bool>;

    /// Exportable tables owned by `schema`, in a stable order.
    fn get_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Whether `schema.table` exists and its columns are visible to us.
    fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;
}
