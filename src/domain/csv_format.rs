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

//! # CSV Serializer
//!
//! Turns typed rows into comma-separated lines.
//!
//! ## Field rules
//! - **NULL**: the configured null text, written verbatim and never quoted.
//! - **Numbers / dates**: canonical text, unquoted.
//! - **Text / binary**: quoted only when the value holds a comma, a double
//!   quote or a line terminator; embedded quotes are doubled. Binary values
//!   are base64-encoded first.
//!
//! Field quoting follows `csv_core`; line assembly and NULL placement are
//! done here so the null text can bypass quoting.
//!
//! Every line, the last one included, ends with the configured terminator.
//! The serializer writes straight into the given writer; buffering belongs
//! to whoever owns the sink.

use crate::domain::entities::{ColumnDescriptor, LineEnding, Value};
use base64::{engine::general_purpose, Engine as _};
use chrono::{FixedOffset, NaiveDateTime};
use std::borrow::Cow;
use std::io::{self, Write};

const DELIMITER: u8 = b',';
const QUOTE: u8 = b'"';

/// Per-job CSV writer state.
pub struct CsvSerializer {
    header: Option<String>,
    null_as: String,
    line_ending: LineEnding,
}

impl CsvSerializer {
    /// Prepares a serializer for one job. With `emit_header` the header line
    /// is written exactly once, before the first data line.
    pub fn new(
        columns: &[ColumnDescriptor],
        emit_header: bool,
        null_as: &str,
        line_ending: LineEnding,
    ) -> Self {
        let header = emit_header.then(|| {
            columns
                .iter()
                .map(|c| escape_text(&c.name))
                .collect::<Vec<_>>()
                .join(",")
        });
        Self {
            header,
            null_as: null_as.to_string(),
            line_ending,
        }
    }

    /// Writes the header if it is still pending. Returns bytes written.
    pub fn write_header(&mut self, out: &mut dyn Write) -> io::Result<usize> {
        match self.header.take() {
            Some(line) => self.write_line(out, &line),
            None => Ok(0),
        }
    }

    /// Writes one data line. Returns bytes written, header included.
    pub fn write_row(&mut self, out: &mut dyn Write, row: &[Value]) -> io::Result<usize> {
        let header_bytes = self.write_header(out)?;
        let line = self.format_row(row);
        Ok(header_bytes + self.write_line(out, &line)?)
    }

    pub fn format_row(&self, row: &[Value]) -> String {
        let mut line = String::new();
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                line.push(char::from(DELIMITER));
            }
            line.push_str(&self.format_field(value));
        }
        line
    }

    pub fn format_field<'a>(&'a self, value: &'a Value) -> Cow<'a, str> {
        match value {
            Value::Null => Cow::Borrowed(self.null_as.as_str()),
            Value::Number(n) => Cow::Borrowed(n.as_str()),
            Value::DateTime { value, offset } => Cow::Owned(format_datetime(value, offset.as_ref())),
            Value::Text(s) => escape_text(s),
            Value::Binary(bytes) => {
                Cow::Owned(escape_text(&general_purpose::STANDARD.encode(bytes)).into_owned())
            }
        }
    }

    fn write_line(&self, out: &mut dyn Write, line: &str) -> io::Result<usize> {
        let terminator = self.line_ending.as_str();
        out.write_all(line.as_bytes())?;
        out.write_all(terminator.as_bytes())?;
        Ok(line.len() + terminator.len())
    }
}

/// Quotes a text field if it holds a delimiter, a quote or a line break.
///
/// Quoting is delegated to `csv_core` with the `Necessary` style. An empty
/// field stays empty: `csv_core` would render a lone empty field as `""`.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if s.is_empty() {
        return Cow::Borrowed(s);
    }
    let mut writer = csv_core::WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .quote_style(csv_core::QuoteStyle::Necessary)
        .build();
    // Worst case: every byte is a quote, plus the enclosing pair.
    let mut buf = vec![0u8; s.len() * 2 + 2];
    let (_, _, written) = writer.field(s.as_bytes(), &mut buf);
    let (_, closing) = writer.finish(&mut buf[written..]);
    buf.truncate(written + closing);

    if buf.len() == s.len() {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// `YYYY-MM-DD HH:MM:SS[.fraction][+HH:MM]`; the fraction only when non-zero.
pub fn format_datetime(value: &NaiveDateTime, offset: Option<&FixedOffset>) -> String {
    let mut text = value.format("%Y-%m-%d %H:%M:%S%.f").to_string();
    if let Some(offset) = offset {
        text.push_str(&offset.to_string());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cols(names: &[&str]) -> Vec<ColumnDescriptor> {
        names
            .iter()
            .map(|name| ColumnDescriptor {
                name: name.to_string(),
            })
            .collect()
    }

    fn render(ser: &mut CsvSerializer, rows: &[Vec<Value>]) -> String {
        let mut out = Vec::new();
        ser.write_header(&mut out).unwrap();
        for row in rows {
            ser.write_row(&mut out, row).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_then_rows_with_null_literal() {
        let mut ser = CsvSerializer::new(&cols(&["A", "B"]), true, "\\N", LineEnding::Lf);
        let out = render(&mut ser, &[vec![Value::Number("1".into()), Value::Null]]);
        assert_eq!(out, "A,B\n1,\\N\n");
    }

    #[test]
    fn test_header_written_once_even_without_rows() {
        let mut ser = CsvSerializer::new(&cols(&["ID"]), true, "", LineEnding::Lf);
        let mut out = Vec::new();
        ser.write_header(&mut out).unwrap();
        ser.write_header(&mut out).unwrap();
        assert_eq!(out, b"ID\n");

        ser.write_row(&mut out, &[Value::Number("7".into())]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ID\n7\n");
    }

    #[test]
    fn test_row_before_explicit_header_still_gets_header_first() {
        let mut ser = CsvSerializer::new(&cols(&["ID"]), true, "", LineEnding::Lf);
        let mut out = Vec::new();
        let written = ser.write_row(&mut out, &[Value::Number("7".into())]).unwrap();
        assert_eq!(out, b"ID\n7\n");
        assert_eq!(written, 5);
    }

    #[test]
    fn test_no_header() {
        let mut ser = CsvSerializer::new(&cols(&["A"]), false, "", LineEnding::Lf);
        let out = render(&mut ser, &[vec![Value::Text("x".into())]]);
        assert_eq!(out, "x\n");
    }

    #[test]
    fn test_null_text_is_never_quoted() {
        let ser = CsvSerializer::new(&cols(&["A"]), false, "a,\"b\"", LineEnding::Lf);
        assert_eq!(ser.format_field(&Value::Null), "a,\"b\"");
    }

    #[test]
    fn test_quoted_text_and_raw_null_share_a_line() {
        let ser = CsvSerializer::new(&[], false, "n,a", LineEnding::Lf);
        let row = vec![Value::Text("a,b".into()), Value::Null, Value::Text("".into())];
        assert_eq!(ser.format_row(&row), "\"a,b\",n,a,");
    }

    #[test]
    fn test_text_quoting_rules() {
        let ser = CsvSerializer::new(&[], false, "", LineEnding::Lf);
        let field = |s: &str| ser.format_field(&Value::Text(s.into())).into_owned();
        assert_eq!(field("plain"), "plain");
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(field("two\nlines"), "\"two\nlines\"");
        assert_eq!(field("cr\rhere"), "\"cr\rhere\"");
        assert_eq!(field(""), "");
    }

    #[test]
    fn test_quoted_fields_round_trip_through_a_csv_reader() {
        let originals = ["a,b", "say \"hi\"", "multi\r\nline", "plain", "\"", ",,,"];
        let ser = CsvSerializer::new(&[], false, "", LineEnding::Lf);
        let row: Vec<Value> = originals.iter().map(|s| Value::Text(s.to_string())).collect();
        let line = format!("{}\n", ser.format_row(&row));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        let parsed: Vec<&str> = record.iter().collect();
        assert_eq!(parsed, originals);
    }

    #[test]
    fn test_numbers_and_dates_are_canonical_and_unquoted() {
        let ser = CsvSerializer::new(&[], false, "", LineEnding::Lf);
        assert_eq!(ser.format_field(&Value::Number("-12.50".into())), "-12.50");

        let date = NaiveDate::from_ymd_opt(2017, 3, 9)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(
            ser.format_field(&Value::DateTime { value: date, offset: None }),
            "2017-03-09 08:05:00"
        );

        let ts = NaiveDate::from_ymd_opt(2023, 10, 27)
            .unwrap()
            .and_hms_micro_opt(14, 30, 45, 123456)
            .unwrap();
        let offset = FixedOffset::east_opt(2 * 3600);
        assert_eq!(
            ser.format_field(&Value::DateTime { value: ts, offset }),
            "2023-10-27 14:30:45.123456+02:00"
        );
    }

    #[test]
    fn test_binary_is_base64() {
        let ser = CsvSerializer::new(&[], false, "", LineEnding::Lf);
        assert_eq!(ser.format_field(&Value::Binary(b"hello".to_vec())), "aGVsbG8=");
    }

    #[test]
    fn test_crlf_terminates_every_line() {
        let mut ser = CsvSerializer::new(&cols(&["A", "B"]), true, "", LineEnding::CrLf);
        let out = render(
            &mut ser,
            &[
                vec![Value::Number("1".into()), Value::Text("x".into())],
                vec![Value::Number("2".into()), Value::Null],
            ],
        );
        assert_eq!(out, "A,B\r\n1,x\r\n2,\r\n");
    }

    #[test]
    fn test_header_names_are_escaped() {
        let mut ser = CsvSerializer::new(&cols(&["A,B", "C"]), true, "", LineEnding::Lf);
        let out = render(&mut ser, &[]);
        assert_eq!(out, "\"A,B\",C\n");
    }
}
