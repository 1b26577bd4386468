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

//! # Oracle Session Adapter
//!
//! One `OracleSession` wraps the single `oracle::Connection` of a run and
//! implements both ports:
//! - `MetadataPort`: dictionary lookups used by the target resolver.
//! - `ExtractionPort`: statement execution with array fetches of exactly
//!   `batch_size` rows per round-trip.
//!
//! Column values are mapped onto the closed `Value` variant set here, so
//! nothing above this layer sees driver types.

use crate::domain::entities::{Row, Value};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::oracle::sql_utils::{
    with_as_of_scn, SQL_CURRENT_SCHEMA, SQL_LIST_TABLES, SQL_SCHEMA_EXISTS, SQL_TABLE_EXISTS,
};
use crate::ports::extraction_port::{ExtractionPort, RowCursor};
use crate::ports::metadata_port::MetadataPort;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use oracle::sql_type::{OracleType, Timestamp};
use oracle::{Connection, Connector, ResultSet};

/// Login details for the one session of a run.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub connect_string: String,
    /// OS-authenticated login (`/` on the command line).
    pub external_auth: bool,
}

pub struct OracleSession {
    conn: Connection,
}

impl OracleSession {
    pub fn connect(credentials: &Credentials) -> Result<Self> {
        let target = if credentials.connect_string.is_empty() {
            "<default database>"
        } else {
            credentials.connect_string.as_str()
        };
        info!(
            "Connecting to {} as {}",
            target,
            if credentials.external_auth { "<external>" } else { credentials.username.as_str() }
        );

        let conn = Connector::new(
            credentials.username.as_str(),
            credentials.password.as_str(),
            credentials.connect_string.as_str(),
        )
        .external_auth(credentials.external_auth)
        .connect()
        .map_err(|e| ExportError::ConfigError(format!("unable to connect: {}", e)))?;

        Ok(Self { conn })
    }

    /// Closes the session; called once after the last job.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(ExportError::from)
    }

    fn count(&self, sql: &str, params: &[&dyn oracle::sql_type::ToSql]) -> Result<u64> {
        Ok(self.conn.query_row_as::<u64>(sql, params)?)
    }
}

impl MetadataPort for OracleSession {
    fn current_schema(&self) -> Result<String> {
        Ok(self.conn.query_row_as::<String>(SQL_CURRENT_SCHEMA, &[])?)
    }

    fn schema_exists(&self, schema: &str) -> Result<bool> {
        Ok(self.count(SQL_SCHEMA_EXISTS, &[&schema])? > 0)
    }

    fn get_tables(&self, schema: &str) -> Result<Vec<String>> {
        let rows = self.conn.query_as::<String>(SQL_LIST_TABLES, &[&schema])?;
        let mut tables = Vec::new();
        for row_result in rows {
            tables.push(row_result?);
        }
        Ok(tables)
    }

    fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        Ok(self.count(SQL_TABLE_EXISTS, &[&schema, &table])? > 0)
    }
}

impl ExtractionPort for OracleSession {
    fn execute<'a>(
        &'a self,
        statement: &str,
        point_in_time: Option<u64>,
        batch_size: usize,
    ) -> Result<Box<dyn RowCursor + 'a>> {
        let sql = with_as_of_scn(statement, point_in_time);
        let array_size = u32::try_from(batch_size).unwrap_or(u32::MAX);
        debug!("Executing (array size {}): {}", array_size, sql);

        let stmt = self
            .conn
            .statement(&sql)
            .fetch_array_size(array_size)
            .prefetch_rows(array_size)
            .build()?;
        let rows = stmt.into_result_set::<oracle::Row>(&[])?;

        let col_infos = rows.column_info();
        let names = col_infos.iter().map(|c| c.name().to_string()).collect();
        let types: Vec<OracleType> = col_infos.iter().map(|c| c.oracle_type().clone()).collect();
        for (info, otype) in col_infos.iter().zip(&types) {
            if is_unsupported(otype) {
                warn!(
                    "Skipping column {}: unsupported type {}, exported as NULL",
                    info.name(),
                    otype
                );
            }
        }

        Ok(Box::new(OracleCursor {
            rows,
            names,
            types,
            batch_size,
        }))
    }
}

struct OracleCursor {
    rows: ResultSet<'static, oracle::Row>,
    names: Vec<String>,
    types: Vec<OracleType>,
    batch_size: usize,
}

impl RowCursor for OracleCursor {
    fn column_names(&self) -> &[String] {
        &self.names
    }

    fn next_batch(&mut self) -> Result<Option<Vec<Row>>> {
        let mut batch = Vec::with_capacity(self.batch_size.min(4096));
        while batch.len() < self.batch_size {
            let Some(row_res) = self.rows.next() else {
                break;
            };
            let row = row_res?;
            let values = self
                .types
                .iter()
                .enumerate()
                .map(|(i, otype)| read_value(&row, i, otype))
                .collect::<Result<Row>>()?;
            batch.push(values);
        }
        Ok((!batch.is_empty()).then_some(batch))
    }
}

/// Types with no text rendering. Such columns are blanked, not fatal.
fn is_unsupported(otype: &OracleType) -> bool {
    matches!(
        otype,
        OracleType::Object(_) | OracleType::BFILE | OracleType::RefCursor
    )
}

/// Reads column `i` of `row` as a `Value`, dispatching on the driver type.
fn read_value(row: &oracle::Row, i: usize, otype: &OracleType) -> Result<Value> {
    let value = match otype {
        t if is_unsupported(t) => None,
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::Int64
        | OracleType::UInt64
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => row.get::<_, Option<String>>(i)?.map(Value::Number),
        OracleType::Date | OracleType::Timestamp(_) => row
            .get::<_, Option<Timestamp>>(i)?
            .map(|ts| to_datetime(&ts, false))
            .transpose()?,
        OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => row
            .get::<_, Option<Timestamp>>(i)?
            .map(|ts| to_datetime(&ts, true))
            .transpose()?,
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
            row.get::<_, Option<Vec<u8>>>(i)?.map(Value::Binary)
        }
        _ => row.get::<_, Option<String>>(i)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn to_datetime(ts: &Timestamp, with_offset: bool) -> Result<Value> {
    let value: NaiveDateTime = NaiveDate::from_ymd_opt(ts.year(), ts.month(), ts.day())
        .and_then(|d| d.and_hms_nano_opt(ts.hour(), ts.minute(), ts.second(), ts.nanosecond()))
        .ok_or_else(|| ExportError::QueryError(format!("timestamp out of range: {}", ts)))?;
    let offset = if with_offset {
        FixedOffset::east_opt(ts.tz_offset())
    } else {
        None
    };
    Ok(Value::DateTime { value, offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_types_are_blanked() {
        assert!(is_unsupported(&OracleType::BFILE));
        assert!(is_unsupported(&OracleType::RefCursor));
        assert!(!is_unsupported(&OracleType::Varchar2(10)));
        assert!(!is_unsupported(&OracleType::Number(10, 2)));
        assert!(!is_unsupported(&OracleType::IntervalYM(2)));
    }

    #[test]
    fn test_to_datetime_without_offset() {
        let ts = Timestamp::new(2023, 10, 27, 14, 30, 45, 123456000).unwrap();
        let expected = NaiveDate::from_ymd_opt(2023, 10, 27)
            .unwrap()
            .and_hms_micro_opt(14, 30, 45, 123456)
            .unwrap();
        assert_eq!(
            to_datetime(&ts, false).unwrap(),
            Value::DateTime { value: expected, offset: None }
        );
    }
}
