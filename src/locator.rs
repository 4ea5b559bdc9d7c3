//! Request validation and resolution to concrete remote archives.
//!
//! The publication site exposes one full-snapshot (zenken) archive per
//! prefecture plus a nationwide one, and one differential (sabun) archive
//! per publication day. Full and per-prefecture requests resolve from a
//! static lookup table with no network access; only "latest diff" needs to
//! consult the site, by scanning the diff listing page for publication
//! dates written in Japanese era notation (令和/平成) and picking the
//! newest one.

use std::sync::LazyLock;

use chrono::NaiveDate;
use log::{debug, info};
use regex::Regex;

use crate::errors::{RegistryError, Result};
use crate::schema::parse_compact_date;
use crate::transport::Transport;

/// Download root of the Corporate Number Publication Site.
pub const DEFAULT_BASE_URL: &str = "https://www.houjin-bangou.nta.go.jp/download";

/// The 47 prefectures, paired with their JIS X 0401 codes.
///
/// Matching is case-insensitive on the Latin-alphabet names. Code `00`
/// (not listed) addresses the nationwide archive.
pub static PREFECTURES: [(&str, u8); 47] = [
    ("Hokkaido", 1),
    ("Aomori", 2),
    ("Iwate", 3),
    ("Miyagi", 4),
    ("Akita", 5),
    ("Yamagata", 6),
    ("Fukushima", 7),
    ("Ibaraki", 8),
    ("Tochigi", 9),
    ("Gunma", 10),
    ("Saitama", 11),
    ("Chiba", 12),
    ("Tokyo", 13),
    ("Kanagawa", 14),
    ("Niigata", 15),
    ("Toyama", 16),
    ("Ishikawa", 17),
    ("Fukui", 18),
    ("Yamanashi", 19),
    ("Nagano", 20),
    ("Gifu", 21),
    ("Shizuoka", 22),
    ("Aichi", 23),
    ("Mie", 24),
    ("Shiga", 25),
    ("Kyoto", 26),
    ("Osaka", 27),
    ("Hyogo", 28),
    ("Nara", 29),
    ("Wakayama", 30),
    ("Tottori", 31),
    ("Shimane", 32),
    ("Okayama", 33),
    ("Hiroshima", 34),
    ("Yamaguchi", 35),
    ("Tokushima", 36),
    ("Kagawa", 37),
    ("Ehime", 38),
    ("Kochi", 39),
    ("Fukuoka", 40),
    ("Saga", 41),
    ("Nagasaki", 42),
    ("Kumamoto", 43),
    ("Oita", 44),
    ("Miyazaki", 45),
    ("Kagoshima", 46),
    ("Okinawa", 47),
];

/// A logical fetch target, validated and resolved by [`Locator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryRequest {
    /// The nationwide full snapshot.
    Full,
    /// The full snapshot of a single prefecture, by Latin-alphabet name.
    Prefecture(String),
    /// A daily differential. `date` is a compact `YYYYMMDD` literal; when
    /// absent, the newest published diff is discovered from the listing.
    Diff { date: Option<String> },
}

/// Container format of a published archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerFormat {
    Zip,
}

/// Text encoding of the archive member.
///
/// The registry's canonical CSV is Shift_JIS; the site also publishes a
/// Unicode rendition of each archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    ShiftJis,
    Utf8,
}

/// One concrete remote archive, ready to be opened by [`crate::stream`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteResource {
    pub url: String,
    pub container: ContainerFormat,
    pub encoding: TextEncoding,
    /// Short human-readable identifier, carried through errors and
    /// [`crate::stream::RawLine`]s.
    pub label: String,
}

/// Resolves [`RegistryRequest`]s against the publication site's URL layout.
#[derive(Clone, Debug)]
pub struct Locator {
    base_url: String,
    encoding: TextEncoding,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the locator at a different download root (mirrors, tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            encoding: TextEncoding::ShiftJis,
        }
    }

    /// Switch resolved resources to the site's Unicode renditions.
    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// URL of the diff listing page consulted for latest-diff discovery.
    #[must_use]
    pub fn listing_url(&self) -> String {
        format!("{}/sabun/index.html", self.base_url)
    }

    /// Resolve a request to the archives it denotes.
    ///
    /// Full and prefecture requests resolve statically. `Diff` with an
    /// explicit date resolves statically after validation; `Diff` without
    /// a date fetches the listing page through `transport` and picks the
    /// newest published date.
    ///
    /// # Errors
    /// `InvalidPrefecture` for an unknown region name, `InvalidDateFormat`
    /// for a malformed date literal (checked before any network access),
    /// `ResourceNotFound` when a diff date lies in the future or discovery
    /// finds nothing published.
    pub fn resolve(
        &self,
        request: &RegistryRequest,
        transport: &dyn Transport,
    ) -> Result<Vec<RemoteResource>> {
        let resources = match request {
            RegistryRequest::Full => vec![self.snapshot_resource(0, "zenken-all")],
            RegistryRequest::Prefecture(name) => {
                let code = prefecture_code(name)?;
                let label = format!("zenken-{:02}", code);
                vec![self.snapshot_resource(code, &label)]
            }
            RegistryRequest::Diff { date } => {
                let date = match date {
                    Some(literal) => {
                        let parsed = parse_compact_date(literal).ok_or_else(|| {
                            RegistryError::InvalidDateFormat {
                                input: literal.clone(),
                            }
                        })?;
                        if parsed > today() {
                            return Err(RegistryError::ResourceNotFound {
                                target: format!("diff for future date {literal}"),
                            });
                        }
                        parsed
                    }
                    None => self.discover_latest_diff(transport)?,
                };
                vec![self.diff_resource(date)]
            }
        };
        info!(
            "resolved {:?} to {} resource(s)",
            request,
            resources.len()
        );
        Ok(resources)
    }

    fn snapshot_resource(&self, code: u8, label: &str) -> RemoteResource {
        RemoteResource {
            url: format!("{}/zenken/{:02}.zip", self.base_url, code),
            container: ContainerFormat::Zip,
            encoding: self.encoding,
            label: label.to_string(),
        }
    }

    fn diff_resource(&self, date: NaiveDate) -> RemoteResource {
        let compact = date.format("%Y%m%d");
        RemoteResource {
            url: format!("{}/sabun/diff_{compact}.zip", self.base_url),
            container: ContainerFormat::Zip,
            encoding: self.encoding,
            label: format!("diff-{compact}"),
        }
    }

    /// Scan the diff listing for era-notation dates and take the newest
    /// one that is not in the future.
    fn discover_latest_diff(&self, transport: &dyn Transport) -> Result<NaiveDate> {
        let url = self.listing_url();
        let listing = transport.fetch_text(&url)?;
        let today = today();
        let latest = listed_dates(&listing)
            .filter(|date| *date <= today)
            .max()
            .ok_or_else(|| RegistryError::ResourceNotFound {
                target: format!("diff listing at {url}"),
            })?;
        debug!("diff discovery picked {latest}");
        Ok(latest)
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

fn prefecture_code(name: &str) -> Result<u8> {
    let wanted = name.trim();
    PREFECTURES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(wanted))
        .map(|&(_, code)| code)
        .ok_or_else(|| RegistryError::InvalidPrefecture {
            name: name.to_string(),
        })
}

static WAREKI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(令和|平成)(\d+|元)年(\d+)月(\d+)日").expect("wareki pattern")
});

/// Convert a Japanese-era date like `令和8年2月20日` to a calendar date.
///
/// 元年 (the accession year) counts as year 1. Returns `None` when the
/// text carries no era date or the day is impossible.
#[must_use]
pub fn parse_wareki_date(text: &str) -> Option<NaiveDate> {
    let captures = WAREKI.captures(text)?;
    let year_in_era: i32 = match &captures[2] {
        "元" => 1,
        digits => digits.parse().ok()?,
    };
    let offset = match &captures[1] {
        "令和" => 2018,
        "平成" => 1988,
        _ => return None,
    };
    let month: u32 = captures[3].parse().ok()?;
    let day: u32 = captures[4].parse().ok()?;
    NaiveDate::from_ymd_opt(year_in_era + offset, month, day)
}

/// All era-notation dates appearing in a listing document, in text order.
fn listed_dates(listing: &str) -> impl Iterator<Item = NaiveDate> + '_ {
    WAREKI
        .find_iter(listing)
        .filter_map(|m| parse_wareki_date(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wareki_conversion_matches_publication_notation() {
        assert_eq!(
            parse_wareki_date("令和8年2月20日"),
            NaiveDate::from_ymd_opt(2026, 2, 20)
        );
        assert_eq!(
            parse_wareki_date("令和元年5月1日"),
            NaiveDate::from_ymd_opt(2019, 5, 1)
        );
        assert_eq!(
            parse_wareki_date("平成31年4月30日"),
            NaiveDate::from_ymd_opt(2019, 4, 30)
        );
        assert_eq!(parse_wareki_date("不正な文字列"), None);
    }

    #[test]
    fn listing_scan_finds_every_date() {
        let listing = "<th>令和8年2月20日</th><th>令和8年2月19日</th><th>平成31年4月30日</th>";
        let dates: Vec<_> = listed_dates(listing).collect();
        assert_eq!(dates.len(), 3);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2026, 2, 20).unwrap());
    }

    #[test]
    fn prefecture_lookup_is_case_insensitive() {
        assert_eq!(prefecture_code("Shimane").unwrap(), 32);
        assert_eq!(prefecture_code("shimane").unwrap(), 32);
        assert_eq!(prefecture_code("SHIMANE").unwrap(), 32);
        assert!(prefecture_code("Atlantis").is_err());
    }
}
