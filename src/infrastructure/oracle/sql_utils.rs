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

//! Oracle SQL helpers and the dictionary queries used by the session adapter.

/// Exportable tables of one owner. Nested tables, secondary objects and
/// IOT overflow segments cannot be selected from directly.
pub const SQL_LIST_TABLES: &str = "
    SELECT table_name
    FROM all_tables
    WHERE owner = :1
      AND nested = 'NO'
      AND secondary = 'N'
      AND (iot_type IS NULL OR iot_type = 'IOT')
    ORDER BY table_name
";
pub const SQL_SCHEMA_EXISTS: &str = "SELECT COUNT(*) FROM all_users WHERE username = :1";
pub const SQL_TABLE_EXISTS: &str =
    "SELECT COUNT(*) FROM all_tab_columns WHERE owner = :1 AND table_name = :2";
pub const SQL_CURRENT_SCHEMA: &str = "SELECT SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA') FROM dual";

/// Appends an `AS OF SCN` flashback clause when a change number is given.
pub fn with_as_of_scn(statement: &str, scn: Option<u64>) -> String {
    match scn {
        Some(scn) => format!("{} AS OF SCN {}", statement, scn),
        None => statement.to_string(),
    }
}
