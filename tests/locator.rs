use corpreg::locator::{Locator, RegistryRequest, TextEncoding, PREFECTURES};
use corpreg::testing::{PanickingTransport, StaticTransport};
use corpreg::RegistryError;

const BASE: &str = "https://registry.test/download";

#[test]
fn every_prefecture_resolves_to_exactly_one_resource() {
    let locator = Locator::with_base_url(BASE);
    for &(name, code) in PREFECTURES.iter() {
        for variant in [
            name.to_string(),
            name.to_lowercase(),
            name.to_uppercase(),
        ] {
            let resources = locator
                .resolve(
                    &RegistryRequest::Prefecture(variant.clone()),
                    &PanickingTransport,
                )
                .unwrap_or_else(|err| panic!("{variant} failed: {err}"));
            assert_eq!(resources.len(), 1);
            assert_eq!(resources[0].url, format!("{BASE}/zenken/{code:02}.zip"));
        }
    }
}

#[test]
fn full_snapshot_resolves_to_the_nationwide_archive() {
    let locator = Locator::with_base_url(BASE);
    let resources = locator
        .resolve(&RegistryRequest::Full, &PanickingTransport)
        .unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].url, format!("{BASE}/zenken/00.zip"));
    assert_eq!(resources[0].label, "zenken-all");
}

#[test]
fn unknown_region_name_is_rejected() {
    let locator = Locator::with_base_url(BASE);
    let err = locator
        .resolve(
            &RegistryRequest::Prefecture("Atlantis".into()),
            &PanickingTransport,
        )
        .err()
        .expect("must fail");
    assert!(matches!(
        err,
        RegistryError::InvalidPrefecture { ref name } if name == "Atlantis"
    ));
}

#[test]
fn malformed_diff_dates_fail_without_network_access() {
    let locator = Locator::with_base_url(BASE);
    for bad in ["2026-02-20", "2026022", "202602201", "abcdefgh", "20260230", ""] {
        let err = locator
            .resolve(
                &RegistryRequest::Diff {
                    date: Some(bad.to_string()),
                },
                &PanickingTransport,
            )
            .err()
            .unwrap_or_else(|| panic!("'{bad}' must fail"));
        assert!(
            matches!(err, RegistryError::InvalidDateFormat { ref input } if input == bad),
            "'{bad}' produced {err}"
        );
    }
}

#[test]
fn explicit_diff_date_resolves_statically() {
    let locator = Locator::with_base_url(BASE);
    let resources = locator
        .resolve(
            &RegistryRequest::Diff {
                date: Some("20260220".into()),
            },
            &PanickingTransport,
        )
        .unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].url, format!("{BASE}/sabun/diff_20260220.zip"));
    assert_eq!(resources[0].label, "diff-20260220");
}

#[test]
fn future_diff_date_is_not_found_without_network_access() {
    let locator = Locator::with_base_url(BASE);
    let err = locator
        .resolve(
            &RegistryRequest::Diff {
                date: Some("29991231".into()),
            },
            &PanickingTransport,
        )
        .err()
        .expect("must fail");
    assert!(matches!(err, RegistryError::ResourceNotFound { .. }));
}

#[test]
fn latest_diff_discovery_picks_the_newest_listed_date() -> anyhow::Result<()> {
    let listing = concat!(
        "<table><tbody>",
        "<tr><th>令和8年2月19日</th><td><a>download</a></td></tr>",
        "<tr><th>令和8年2月20日</th><td><a>download</a></td></tr>",
        "<tr><th>平成31年4月30日</th><td><a>download</a></td></tr>",
        "</tbody></table>"
    );
    let transport =
        StaticTransport::new().with(format!("{BASE}/sabun/index.html"), listing.as_bytes());
    let locator = Locator::with_base_url(BASE);
    let resources = locator.resolve(&RegistryRequest::Diff { date: None }, &transport)?;
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].url, format!("{BASE}/sabun/diff_20260220.zip"));
    Ok(())
}

#[test]
fn discovery_with_no_listed_dates_is_not_found() {
    let transport = StaticTransport::new().with(
        format!("{BASE}/sabun/index.html"),
        "<html>no publications today</html>".as_bytes(),
    );
    let locator = Locator::with_base_url(BASE);
    let err = locator
        .resolve(&RegistryRequest::Diff { date: None }, &transport)
        .err()
        .expect("must fail");
    assert!(matches!(err, RegistryError::ResourceNotFound { .. }));
}

#[test]
fn encoding_override_carries_into_resources() {
    let locator = Locator::with_base_url(BASE).with_encoding(TextEncoding::Utf8);
    let resources = locator
        .resolve(&RegistryRequest::Full, &PanickingTransport)
        .unwrap();
    assert_eq!(resources[0].encoding, TextEncoding::Utf8);
}
