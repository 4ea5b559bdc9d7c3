use corpreg::dataset::read_dataset;
use corpreg::testing::{sample_csv_line, scratch_dir, shift_jis_csv_archive, StaticTransport};
use corpreg::{DatasetOptions, RegistryClient, RegistryError, RegistryRequest};

const BASE: &str = "https://registry.test/download";

fn shimane_archive() -> Vec<u8> {
    let lines = vec![
        sample_csv_line(1, "1000000000001", "松江水産株式会社", "20260220"),
        sample_csv_line(2, "1000000000002", "出雲工務店株式会社", "20260220"),
        sample_csv_line(3, "1000000000003", "石見物産合同会社", "20260219"),
    ];
    shift_jis_csv_archive("32_shimane_all.csv", &lines)
}

fn client_with(transport: StaticTransport) -> RegistryClient {
    RegistryClient::builder()
        .base_url(BASE)
        .transport(transport)
        .build()
}

#[test]
fn shimane_snapshot_fetches_into_a_three_row_table() -> anyhow::Result<()> {
    let transport =
        StaticTransport::new().with(format!("{BASE}/zenken/32.zip"), shimane_archive());
    let client = client_with(transport);

    let table = client.fetch(&RegistryRequest::Prefecture("Shimane".into()))?;
    assert_eq!(table.len(), 3);

    let numbers: Vec<_> = table
        .rows()
        .iter()
        .map(|r| r.corporate_number.as_str())
        .collect();
    assert_eq!(
        numbers,
        ["1000000000001", "1000000000002", "1000000000003"]
    );

    // Declared column order follows the schema table.
    let columns = table.columns();
    assert_eq!(columns.first(), Some(&"sequence_number"));
    assert_eq!(columns[1], "corporate_number");
    assert_eq!(columns.last(), Some(&"hihyoji"));
    Ok(())
}

#[test]
fn shimane_snapshot_writes_a_partitioned_dataset() -> anyhow::Result<()> {
    let transport =
        StaticTransport::new().with(format!("{BASE}/zenken/32.zip"), shimane_archive());
    let client = client_with(transport);
    let dir = scratch_dir()?;

    let root = client.fetch_to_dataset(
        &RegistryRequest::Prefecture("Shimane".into()),
        &DatasetOptions::new()
            .with_root(dir.path())
            .with_partition_cols(["update_date"]),
    )?;
    assert_eq!(root, dir.path());
    assert!(root.join("update_date=2026-02-20").is_dir());
    assert!(root.join("update_date=2026-02-19").is_dir());

    let read_back = read_dataset(&root)?;
    assert_eq!(read_back.len(), 3);
    Ok(())
}

#[test]
fn repeated_diff_ingestion_accumulates_history() -> anyhow::Result<()> {
    let archive = shift_jis_csv_archive(
        "diff_20260220.csv",
        &[sample_csv_line(1, "1000000000001", "更新株式会社", "20260220")],
    );
    let transport =
        StaticTransport::new().with(format!("{BASE}/sabun/diff_20260220.zip"), archive);
    let client = client_with(transport);
    let dir = scratch_dir()?;
    let options = DatasetOptions::new()
        .with_root(dir.path())
        .with_partition_cols(["update_date"]);
    let request = RegistryRequest::Diff {
        date: Some("20260220".into()),
    };

    client.fetch_to_dataset(&request, &options)?;
    client.fetch_to_dataset(&request, &options)?;

    // Both runs are visible; nothing was overwritten.
    assert_eq!(read_dataset(dir.path())?.len(), 2);
    Ok(())
}

#[test]
fn latest_diff_is_discovered_from_the_listing() -> anyhow::Result<()> {
    let listing = concat!(
        "<tr><th>令和8年2月19日</th><td><a>download</a></td></tr>",
        "<tr><th>令和8年2月20日</th><td><a>download</a></td></tr>",
    );
    let archive = shift_jis_csv_archive(
        "diff_20260220.csv",
        &[sample_csv_line(1, "1000000000009", "最新株式会社", "20260220")],
    );
    let transport = StaticTransport::new()
        .with(format!("{BASE}/sabun/index.html"), listing.as_bytes())
        .with(format!("{BASE}/sabun/diff_20260220.zip"), archive);
    let client = client_with(transport);

    let table = client.fetch(&RegistryRequest::Diff { date: None })?;
    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].corporate_number, "1000000000009");
    Ok(())
}

#[test]
fn unpublished_diff_date_is_not_found() {
    let client = client_with(StaticTransport::new());
    let err = client
        .fetch(&RegistryRequest::Diff {
            date: Some("20200101".into()),
        })
        .err()
        .expect("must fail");
    assert!(matches!(err, RegistryError::ResourceNotFound { .. }));
}

#[test]
fn invalid_prefecture_surfaces_before_any_fetch() {
    let client = client_with(StaticTransport::new());
    let err = client
        .fetch(&RegistryRequest::Prefecture("Atlantis".into()))
        .err()
        .expect("must fail");
    assert!(matches!(err, RegistryError::InvalidPrefecture { .. }));
}

#[test]
fn malformed_archive_line_fails_the_whole_fetch() -> anyhow::Result<()> {
    let lines = vec![
        sample_csv_line(1, "1000000000001", "正常株式会社", "20260220"),
        sample_csv_line(2, "1000000000002", "異常株式会社", "2026-02-20"),
    ];
    let transport = StaticTransport::new().with(
        format!("{BASE}/zenken/32.zip"),
        shift_jis_csv_archive("32.csv", &lines),
    );
    let client = client_with(transport);

    let err = client
        .fetch(&RegistryRequest::Prefecture("Shimane".into()))
        .err()
        .expect("must fail");
    assert!(matches!(
        err,
        RegistryError::MalformedRecord { line: 2, .. }
    ));
    Ok(())
}
