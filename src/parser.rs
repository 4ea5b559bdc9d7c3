//! RecordParser: decoded lines to typed registry rows.
//!
//! Each line is split with the `csv` reader (the publication quotes every
//! field, and registered names may contain commas), checked against the
//! exact column count of [`SCHEMA`], and coerced field by field:
//! identifier-like columns stay strings, date columns parse from compact
//! `YYYYMMDD` literals, and empty strings normalize to `None` for nullable
//! columns.
//!
//! A single malformed line fails the whole parse for its resource — each
//! line of a publication archive is either a full well-formed record or
//! the archive is corrupt. Callers that want to skip a broken archive do
//! so at the resource level; the parser never drops rows silently.

use crate::errors::{RegistryError, Result};
use crate::schema::{parse_compact_date, CorporateRecord, SCHEMA};
use crate::stream::RawLine;
use chrono::NaiveDate;

/// Wrap a line stream into a lazy stream of typed records.
pub fn parse<I>(lines: I) -> RecordStream<I>
where
    I: Iterator<Item = Result<RawLine>>,
{
    RecordStream { lines, failed: false }
}

/// Lazy iterator of [`CorporateRecord`]s. Fused after the first error.
pub struct RecordStream<I> {
    lines: I,
    failed: bool,
}

impl<I> Iterator for RecordStream<I>
where
    I: Iterator<Item = Result<RawLine>>,
{
    type Item = Result<CorporateRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match self.lines.next()? {
            Ok(line) => parse_line(&line),
            Err(err) => Err(err),
        };
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Parse one publication line into a typed record.
///
/// # Errors
/// `MalformedRecord` with the line's resource label and 1-based number on
/// any schema violation: unbalanced quoting, wrong column count, an empty
/// non-nullable field, or a date literal that is not `YYYYMMDD`.
pub fn parse_line(line: &RawLine) -> Result<CorporateRecord> {
    let malformed = |detail: String| RegistryError::MalformedRecord {
        resource: line.resource.to_string(),
        line: line.number,
        detail,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line.text.as_bytes());
    let mut fields = csv::StringRecord::new();
    match reader.read_record(&mut fields) {
        Ok(true) => {}
        Ok(false) => return Err(malformed("empty line".to_string())),
        Err(err) => return Err(malformed(err.to_string())),
    }
    if fields.len() != SCHEMA.len() {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            SCHEMA.len(),
            fields.len()
        )));
    }

    let text = |pos: usize| -> Result<String> {
        let value = &fields[pos];
        if value.is_empty() {
            return Err(malformed(format!(
                "column '{}' must not be empty",
                SCHEMA[pos].name
            )));
        }
        Ok(value.to_string())
    };
    let opt_text = |pos: usize| -> Option<String> {
        let value = &fields[pos];
        (!value.is_empty()).then(|| value.to_string())
    };
    let date = |pos: usize| -> Result<NaiveDate> {
        parse_compact_date(&fields[pos]).ok_or_else(|| {
            malformed(format!(
                "column '{}' has invalid date literal '{}'",
                SCHEMA[pos].name, &fields[pos]
            ))
        })
    };
    let opt_date = |pos: usize| -> Result<Option<NaiveDate>> {
        if fields[pos].is_empty() {
            return Ok(None);
        }
        date(pos).map(Some)
    };

    Ok(CorporateRecord {
        sequence_number: text(0)?,
        corporate_number: text(1)?,
        process: text(2)?,
        correct: text(3)?,
        update_date: date(4)?,
        change_date: opt_date(5)?,
        name: text(6)?,
        name_image_id: opt_text(7),
        kind: text(8)?,
        prefecture_name: opt_text(9),
        city_name: opt_text(10),
        street_number: opt_text(11),
        address_image_id: opt_text(12),
        prefecture_code: opt_text(13),
        city_code: opt_text(14),
        post_code: opt_text(15),
        address_outside: opt_text(16),
        address_outside_image_id: opt_text(17),
        close_date: opt_date(18)?,
        close_cause: opt_text(19),
        successor_corporate_number: opt_text(20),
        change_cause: opt_text(21),
        assignment_date: date(22)?,
        latest: text(23)?,
        en_name: opt_text(24),
        en_prefecture_name: opt_text(25),
        en_city_name: opt_text(26),
        en_address_outside: opt_text(27),
        furigana: opt_text(28),
        hihyoji: text(29)?,
    })
}
