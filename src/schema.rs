//! The registry's fixed column schema and the typed row it maps to.
//!
//! The publication format is a 30-column CSV with a documented positional
//! layout and no header row. The layout is captured here as a static,
//! versioned table ([`SCHEMA`]) that the parser and the partition writer
//! both consult, so a schema change is a single-file edit and malformed
//! input is detected against an explicit contract rather than inferred.
//!
//! Identifier-like columns (corporate number, prefecture/city codes, post
//! code) stay fixed-width strings end to end. Parsing them to integers
//! would silently drop leading zeros, which for corporate numbers changes
//! the identifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Semantic type of a schema column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Free text or a fixed-width code, kept verbatim.
    Text,
    /// Compact calendar date, `YYYYMMDD` digits.
    Date,
}

/// One entry of the positional schema table.
#[derive(Clone, Copy, Debug)]
pub struct Column {
    /// Column name, also the Parquet field name.
    pub name: &'static str,
    /// 0-based position within a CSV line.
    pub position: usize,
    pub kind: ColumnKind,
    /// Nullable columns normalize the empty string to an absent value.
    pub nullable: bool,
}

const fn col(name: &'static str, position: usize, kind: ColumnKind, nullable: bool) -> Column {
    Column {
        name,
        position,
        kind,
        nullable,
    }
}

/// The publication's column layout, in file order.
pub static SCHEMA: [Column; 30] = [
    col("sequence_number", 0, ColumnKind::Text, false),
    col("corporate_number", 1, ColumnKind::Text, false),
    col("process", 2, ColumnKind::Text, false),
    col("correct", 3, ColumnKind::Text, false),
    col("update_date", 4, ColumnKind::Date, false),
    col("change_date", 5, ColumnKind::Date, true),
    col("name", 6, ColumnKind::Text, false),
    col("name_image_id", 7, ColumnKind::Text, true),
    col("kind", 8, ColumnKind::Text, false),
    col("prefecture_name", 9, ColumnKind::Text, true),
    col("city_name", 10, ColumnKind::Text, true),
    col("street_number", 11, ColumnKind::Text, true),
    col("address_image_id", 12, ColumnKind::Text, true),
    col("prefecture_code", 13, ColumnKind::Text, true),
    col("city_code", 14, ColumnKind::Text, true),
    col("post_code", 15, ColumnKind::Text, true),
    col("address_outside", 16, ColumnKind::Text, true),
    col("address_outside_image_id", 17, ColumnKind::Text, true),
    col("close_date", 18, ColumnKind::Date, true),
    col("close_cause", 19, ColumnKind::Text, true),
    col("successor_corporate_number", 20, ColumnKind::Text, true),
    col("change_cause", 21, ColumnKind::Text, true),
    col("assignment_date", 22, ColumnKind::Date, false),
    col("latest", 23, ColumnKind::Text, false),
    col("en_name", 24, ColumnKind::Text, true),
    col("en_prefecture_name", 25, ColumnKind::Text, true),
    col("en_city_name", 26, ColumnKind::Text, true),
    col("en_address_outside", 27, ColumnKind::Text, true),
    col("furigana", 28, ColumnKind::Text, true),
    col("hihyoji", 29, ColumnKind::Text, false),
];

/// Look up a schema column by name.
#[must_use]
pub fn column(name: &str) -> Option<&'static Column> {
    SCHEMA.iter().find(|c| c.name == name)
}

/// Column names in schema order.
#[must_use]
pub fn column_names() -> Vec<&'static str> {
    SCHEMA.iter().map(|c| c.name).collect()
}

/// Parse a compact `YYYYMMDD` date literal.
///
/// Returns `None` for anything that is not exactly 8 ASCII digits forming a
/// real calendar date.
#[must_use]
pub fn parse_compact_date(literal: &str) -> Option<NaiveDate> {
    if literal.len() != 8 || !literal.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = literal[0..4].parse().ok()?;
    let month: u32 = literal[4..6].parse().ok()?;
    let day: u32 = literal[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// One typed registry row, mapped 1:1 from a publication CSV line.
///
/// Field order matches [`SCHEMA`]. Date columns are calendar dates; every
/// other column is a string. Nullable columns are `Option`s and never hold
/// an empty string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorporateRecord {
    pub sequence_number: String,
    pub corporate_number: String,
    pub process: String,
    pub correct: String,
    pub update_date: NaiveDate,
    pub change_date: Option<NaiveDate>,
    pub name: String,
    pub name_image_id: Option<String>,
    pub kind: String,
    pub prefecture_name: Option<String>,
    pub city_name: Option<String>,
    pub street_number: Option<String>,
    pub address_image_id: Option<String>,
    pub prefecture_code: Option<String>,
    pub city_code: Option<String>,
    pub post_code: Option<String>,
    pub address_outside: Option<String>,
    pub address_outside_image_id: Option<String>,
    pub close_date: Option<NaiveDate>,
    pub close_cause: Option<String>,
    pub successor_corporate_number: Option<String>,
    pub change_cause: Option<String>,
    pub assignment_date: NaiveDate,
    pub latest: String,
    pub en_name: Option<String>,
    pub en_prefecture_name: Option<String>,
    pub en_city_name: Option<String>,
    pub en_address_outside: Option<String>,
    pub furigana: Option<String>,
    pub hihyoji: String,
}

impl CorporateRecord {
    /// String form of the value in `column`, as used for partition keys.
    ///
    /// `None` means the value is absent for this record. Dates render as
    /// ISO `YYYY-MM-DD`.
    #[must_use]
    pub fn value_of(&self, column: &Column) -> Option<String> {
        fn date(d: &NaiveDate) -> String {
            d.format("%Y-%m-%d").to_string()
        }
        match column.position {
            0 => Some(self.sequence_number.clone()),
            1 => Some(self.corporate_number.clone()),
            2 => Some(self.process.clone()),
            3 => Some(self.correct.clone()),
            4 => Some(date(&self.update_date)),
            5 => self.change_date.as_ref().map(date),
            6 => Some(self.name.clone()),
            7 => self.name_image_id.clone(),
            8 => Some(self.kind.clone()),
            9 => self.prefecture_name.clone(),
            10 => self.city_name.clone(),
            11 => self.street_number.clone(),
            12 => self.address_image_id.clone(),
            13 => self.prefecture_code.clone(),
            14 => self.city_code.clone(),
            15 => self.post_code.clone(),
            16 => self.address_outside.clone(),
            17 => self.address_outside_image_id.clone(),
            18 => self.close_date.as_ref().map(date),
            19 => self.close_cause.clone(),
            20 => self.successor_corporate_number.clone(),
            21 => self.change_cause.clone(),
            22 => Some(date(&self.assignment_date)),
            23 => Some(self.latest.clone()),
            24 => self.en_name.clone(),
            25 => self.en_prefecture_name.clone(),
            26 => self.en_city_name.clone(),
            27 => self.en_address_outside.clone(),
            28 => self.furigana.clone(),
            29 => Some(self.hihyoji.clone()),
            _ => None,
        }
    }
}

/// The in-memory result of a fetch: ordered rows plus the declared column
/// order.
///
/// Row order matches the order records appeared in the source archive(s).
/// This is the only place the full dataset is materialized; the nationwide
/// full snapshot runs to several gigabytes decompressed and should be
/// fetched with the partitioned dataset output instead.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableResult {
    rows: Vec<CorporateRecord>,
}

impl TableResult {
    #[must_use]
    pub fn new(rows: Vec<CorporateRecord>) -> Self {
        Self { rows }
    }

    /// Column names in schema order.
    #[must_use]
    pub fn columns(&self) -> Vec<&'static str> {
        column_names()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[CorporateRecord] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<CorporateRecord> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_positions_are_dense_and_ordered() {
        for (i, column) in SCHEMA.iter().enumerate() {
            assert_eq!(column.position, i, "column {} out of order", column.name);
        }
    }

    #[test]
    fn date_columns_match_the_publication_layout() {
        let dates: Vec<_> = SCHEMA
            .iter()
            .filter(|c| c.kind == ColumnKind::Date)
            .map(|c| c.name)
            .collect();
        assert_eq!(
            dates,
            ["update_date", "change_date", "close_date", "assignment_date"]
        );
    }

    #[test]
    fn compact_dates_reject_separators_and_impossible_days() {
        assert_eq!(
            parse_compact_date("20260220"),
            NaiveDate::from_ymd_opt(2026, 2, 20)
        );
        assert_eq!(parse_compact_date("2026-02-20"), None);
        assert_eq!(parse_compact_date("20260230"), None);
        assert_eq!(parse_compact_date("202602201"), None);
        assert_eq!(parse_compact_date(""), None);
    }
}
