use std::sync::Arc;

use chrono::NaiveDate;
use corpreg::stream::RawLine;
use corpreg::testing::sample_csv_line;
use corpreg::{parse, parser, RegistryError};

fn line(number: u64, text: impl Into<String>) -> RawLine {
    RawLine {
        text: text.into(),
        resource: Arc::from("diff-20260220"),
        number,
    }
}

#[test]
fn well_formed_line_maps_to_a_typed_record() -> anyhow::Result<()> {
    let record = parser::parse_line(&line(
        1,
        sample_csv_line(1, "1000000000001", "サンプル株式会社", "20260220"),
    ))?;
    assert_eq!(record.sequence_number, "1");
    assert_eq!(record.corporate_number, "1000000000001");
    assert_eq!(record.update_date, NaiveDate::from_ymd_opt(2026, 2, 20).unwrap());
    assert_eq!(record.name, "サンプル株式会社");
    assert_eq!(record.prefecture_name.as_deref(), Some("島根県"));
    assert_eq!(record.prefecture_code.as_deref(), Some("32"));
    // Empty publication fields become real nulls, never empty strings.
    assert_eq!(record.name_image_id, None);
    assert_eq!(record.close_date, None);
    assert_eq!(record.en_name, None);
    Ok(())
}

#[test]
fn identifier_columns_keep_leading_zeros() -> anyhow::Result<()> {
    let record = parser::parse_line(&line(
        1,
        sample_csv_line(7, "0123456789012", "ゼロ株式会社", "20260220"),
    ))?;
    assert_eq!(record.corporate_number, "0123456789012");
    Ok(())
}

#[test]
fn quoted_commas_survive_field_splitting() -> anyhow::Result<()> {
    let record = parser::parse_line(&line(
        1,
        sample_csv_line(1, "1000000000001", "合同会社A,B", "20260220"),
    ))?;
    assert_eq!(record.name, "合同会社A,B");
    Ok(())
}

#[test]
fn dashed_date_literal_is_malformed_with_line_context() {
    let lines = vec![
        Ok(line(
            1,
            sample_csv_line(1, "1000000000001", "正常株式会社", "20260220"),
        )),
        Ok(line(
            2,
            sample_csv_line(2, "1000000000002", "異常株式会社", "2026-02-20"),
        )),
    ];
    let results: Vec<_> = parse(lines.into_iter()).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    match &results[1] {
        Err(RegistryError::MalformedRecord {
            resource,
            line,
            detail,
        }) => {
            assert_eq!(resource, "diff-20260220");
            assert_eq!(*line, 2);
            assert!(detail.contains("update_date"), "detail: {detail}");
        }
        other => panic!("expected malformed record, got {other:?}"),
    }
}

#[test]
fn wrong_column_count_is_malformed() {
    let err = parser::parse_line(&line(1, "\"1\",\"1000000000001\",\"01\""))
        .err()
        .expect("must fail");
    assert!(matches!(
        err,
        RegistryError::MalformedRecord { line: 1, ref detail, .. } if detail.contains("expected 30")
    ));
}

#[test]
fn empty_required_column_is_malformed() {
    let text = sample_csv_line(1, "", "名無株式会社", "20260220");
    let err = parser::parse_line(&line(1, text)).err().expect("must fail");
    assert!(matches!(
        err,
        RegistryError::MalformedRecord { ref detail, .. } if detail.contains("corporate_number")
    ));
}

#[test]
fn parse_is_fused_after_the_first_error() {
    let lines = vec![
        Ok(line(1, "not,a,valid,record")),
        Ok(line(
            2,
            sample_csv_line(2, "1000000000002", "後続株式会社", "20260220"),
        )),
    ];
    let mut records = parse(lines.into_iter());
    assert!(matches!(records.next(), Some(Err(_))));
    assert!(records.next().is_none(), "no rows after a malformed line");
}

#[test]
fn impossible_calendar_date_is_malformed() {
    let text = sample_csv_line(1, "1000000000001", "日付株式会社", "20260230");
    let err = parser::parse_line(&line(1, text)).err().expect("must fail");
    assert!(matches!(err, RegistryError::MalformedRecord { .. }));
}
