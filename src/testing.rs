//! Test fixtures and in-memory fakes.
//!
//! Everything the integration tests need to exercise the full pipeline
//! without a network: a [`Transport`] fake serving canned bytes, builders
//! for synthetic publication archives (stored and deflate ZIP members,
//! Shift_JIS payloads), and sample records/lines in the registry's
//! 30-column layout.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};

use encoding_rs::SHIFT_JIS;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};

use crate::errors::{RegistryError, Result};
use crate::schema::{parse_compact_date, CorporateRecord};
use crate::transport::Transport;

/// In-memory [`Transport`] serving canned responses by exact URL.
///
/// Unknown URLs answer with `ResourceNotFound`, mirroring the HTTP
/// transport's 404 signal.
#[derive(Default)]
pub struct StaticTransport {
    responses: HashMap<String, Vec<u8>>,
}

impl StaticTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response body for a URL.
    #[must_use]
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }
}

impl Transport for StaticTransport {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        match self.responses.get(url) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(RegistryError::ResourceNotFound {
                target: url.to_string(),
            }),
        }
    }
}

/// [`Transport`] that panics on any use.
///
/// Lets tests prove a code path performs no network access at all.
pub struct PanickingTransport;

impl Transport for PanickingTransport {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        panic!("unexpected network access to {url}");
    }
}

/// Fresh scratch directory for dataset tests.
///
/// # Errors
/// Propagates temp-dir creation failure.
pub fn scratch_dir() -> io::Result<tempfile::TempDir> {
    tempfile::Builder::new().prefix("corpreg-test-").tempdir()
}

/// Encode text as Shift_JIS bytes.
#[must_use]
pub fn encode_shift_jis(text: &str) -> Vec<u8> {
    let (bytes, _, _) = SHIFT_JIS.encode(text);
    bytes.into_owned()
}

/// A single-member ZIP archive with the member stored uncompressed.
#[must_use]
pub fn zip_archive_stored(member_name: &str, payload: &[u8]) -> Vec<u8> {
    zip_archive(member_name, payload, 0, payload.to_vec())
}

/// A single-member ZIP archive with the member deflate-compressed, the
/// publication's actual layout.
#[must_use]
pub fn zip_archive_deflate(member_name: &str, payload: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).expect("deflate in memory");
    let body = encoder.finish().expect("deflate in memory");
    zip_archive(member_name, payload, 8, body)
}

/// A complete publication-style archive: CSV lines joined with CRLF,
/// encoded as Shift_JIS, deflated into a one-member ZIP.
#[must_use]
pub fn shift_jis_csv_archive(member_name: &str, lines: &[String]) -> Vec<u8> {
    let mut text = lines.join("\r\n");
    text.push_str("\r\n");
    zip_archive_deflate(member_name, &encode_shift_jis(&text))
}

fn zip_archive(member_name: &str, payload: &[u8], method: u16, body: Vec<u8>) -> Vec<u8> {
    let name = member_name.as_bytes();
    let mut crc = Crc::new();
    crc.update(payload);
    let crc = crc.sum();

    let mut out = Vec::new();
    // Local file header.
    push_u32(&mut out, 0x0403_4b50);
    push_u16(&mut out, 20); // version needed
    push_u16(&mut out, 0); // flags
    push_u16(&mut out, method);
    push_u16(&mut out, 0); // mod time
    push_u16(&mut out, 0); // mod date
    push_u32(&mut out, crc);
    push_u32(&mut out, body.len() as u32);
    push_u32(&mut out, payload.len() as u32);
    push_u16(&mut out, name.len() as u16);
    push_u16(&mut out, 0); // extra length
    out.extend_from_slice(name);
    out.extend_from_slice(&body);

    // Central directory.
    let central_offset = out.len() as u32;
    push_u32(&mut out, 0x0201_4b50);
    push_u16(&mut out, 20); // version made by
    push_u16(&mut out, 20); // version needed
    push_u16(&mut out, 0); // flags
    push_u16(&mut out, method);
    push_u16(&mut out, 0); // mod time
    push_u16(&mut out, 0); // mod date
    push_u32(&mut out, crc);
    push_u32(&mut out, body.len() as u32);
    push_u32(&mut out, payload.len() as u32);
    push_u16(&mut out, name.len() as u16);
    push_u16(&mut out, 0); // extra length
    push_u16(&mut out, 0); // comment length
    push_u16(&mut out, 0); // disk number
    push_u16(&mut out, 0); // internal attributes
    push_u32(&mut out, 0); // external attributes
    push_u32(&mut out, 0); // local header offset
    out.extend_from_slice(name);
    let central_size = out.len() as u32 - central_offset;

    // End of central directory.
    push_u32(&mut out, 0x0605_4b50);
    push_u16(&mut out, 0); // disk number
    push_u16(&mut out, 0); // central directory disk
    push_u16(&mut out, 1); // entries on this disk
    push_u16(&mut out, 1); // entries total
    push_u32(&mut out, central_size);
    push_u32(&mut out, central_offset);
    push_u16(&mut out, 0); // comment length
    out
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// One publication CSV line in the 30-column layout, every field quoted
/// the way the site emits them. Address fields carry a Shimane sample so
/// Shift_JIS round-trips get exercised.
#[must_use]
pub fn sample_csv_line(
    sequence: u64,
    corporate_number: &str,
    name: &str,
    update_date: &str,
) -> String {
    let sequence = sequence.to_string();
    let fields: [&str; 30] = [
        &sequence,
        corporate_number,
        "01",
        "0",
        update_date,
        update_date,
        name,
        "",
        "301",
        "島根県",
        "松江市",
        "殿町8番地3",
        "",
        "32",
        "32201",
        "6900887",
        "",
        "",
        "",
        "",
        "",
        "",
        "20151005",
        "1",
        "",
        "",
        "",
        "",
        "",
        "0",
    ];
    fields
        .iter()
        .map(|field| format!("\"{field}\""))
        .collect::<Vec<_>>()
        .join(",")
}

/// A fully populated sample record for writer-level tests.
///
/// # Panics
/// Panics if `update_date` is not a valid `YYYYMMDD` literal.
#[must_use]
pub fn sample_record(corporate_number: &str, update_date: &str) -> CorporateRecord {
    let update_date = parse_compact_date(update_date).expect("valid compact date");
    CorporateRecord {
        sequence_number: "1".to_string(),
        corporate_number: corporate_number.to_string(),
        process: "01".to_string(),
        correct: "0".to_string(),
        update_date,
        change_date: Some(update_date),
        name: "サンプル株式会社".to_string(),
        name_image_id: None,
        kind: "301".to_string(),
        prefecture_name: Some("島根県".to_string()),
        city_name: Some("松江市".to_string()),
        street_number: Some("殿町8番地3".to_string()),
        address_image_id: None,
        prefecture_code: Some("32".to_string()),
        city_code: Some("32201".to_string()),
        post_code: Some("6900887".to_string()),
        address_outside: None,
        address_outside_image_id: None,
        close_date: None,
        close_cause: None,
        successor_corporate_number: None,
        change_cause: None,
        assignment_date: parse_compact_date("20151005").expect("valid compact date"),
        latest: "1".to_string(),
        en_name: None,
        en_prefecture_name: None,
        en_city_name: None,
        en_address_outside: None,
        furigana: None,
        hihyoji: "0".to_string(),
    }
}
