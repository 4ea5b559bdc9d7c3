//! StreamDecoder: from a remote archive to a lazy sequence of text lines.
//!
//! The publication convention is a ZIP archive holding exactly one CSV
//! member. The site is consumed as a non-seekable HTTP stream, so the
//! member is extracted by walking the archive's local file header and
//! feeding the body straight into a raw-deflate decoder ([`flate2`]) or a
//! length-bounded passthrough for stored entries. Decompressed bytes are
//! decoded incrementally with [`encoding_rs`], buffering only enough to
//! assemble one complete line before yielding it; the whole archive is
//! never materialized.
//!
//! A [`LineStream`] is single-pass and not restartable: re-reading means a
//! new [`open`]. Dropping it at any point releases the underlying
//! connection. The first undecodable byte sequence aborts the stream with
//! its byte offset; partial decode output is never yielded, since a
//! half-parsed row must not reach a dataset.

use std::io::{self, Read};
use std::sync::Arc;

use encoding_rs::{Decoder, DecoderResult, SHIFT_JIS, UTF_8};
use flate2::read::DeflateDecoder;
use log::debug;

use crate::errors::{RegistryError, Result};
use crate::locator::{ContainerFormat, RemoteResource, TextEncoding};
use crate::transport::Transport;

const READ_CHUNK: usize = 16 * 1024;

/// ZIP record signatures, little-endian.
const LOCAL_FILE_HEADER: u32 = 0x0403_4b50;
const CENTRAL_DIRECTORY: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIRECTORY: u32 = 0x0605_4b50;

/// General-purpose flag bits.
const FLAG_ENCRYPTED: u16 = 0x0001;
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

/// Compression methods used by the publication.
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// One decoded text line, tagged with its origin.
///
/// The resource label matters for diff ingestion, where one logical fetch
/// may span several dated archives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    /// Label of the [`RemoteResource`] the line came from.
    pub resource: Arc<str>,
    /// 1-based line number within the member file.
    pub number: u64,
}

/// Open a streaming line reader over a remote archive.
///
/// The archive's local header is read eagerly, so structural problems
/// (not a ZIP, empty archive, unsupported member encoding) surface here
/// rather than on the first line.
///
/// # Errors
/// `Transport` if the resource cannot be fetched, `Decompression` if the
/// container structure is corrupt or unsupported.
pub fn open(resource: &RemoteResource, transport: &dyn Transport) -> Result<LineStream> {
    let raw = transport.fetch(&resource.url)?;
    let body = match resource.container {
        ContainerFormat::Zip => ZipMemberReader::new(raw, &resource.label)?,
    };
    debug!("opened stream for {}", resource.label);
    Ok(LineStream::new(body, resource))
}

enum MemberBody {
    Stored {
        src: Box<dyn Read + Send>,
        remaining: u64,
    },
    Deflate(DeflateDecoder<Box<dyn Read + Send>>),
}

/// Streaming reader over the first (and, per publication convention, only)
/// member of a ZIP archive.
struct ZipMemberReader {
    body: MemberBody,
}

impl ZipMemberReader {
    fn new(mut src: Box<dyn Read + Send>, resource: &str) -> Result<Self> {
        let corrupt = |detail: String| RegistryError::Decompression {
            resource: resource.to_string(),
            detail,
        };

        let signature = read_u32(&mut src)
            .map_err(|_| corrupt("truncated archive: missing header".to_string()))?;
        match signature {
            LOCAL_FILE_HEADER => {}
            END_OF_CENTRAL_DIRECTORY | CENTRAL_DIRECTORY => {
                return Err(corrupt("archive contains no member file".to_string()));
            }
            other => {
                return Err(corrupt(format!(
                    "not a zip archive (signature {other:#010x})"
                )));
            }
        }

        let mut fixed = [0u8; 26];
        src.read_exact(&mut fixed)
            .map_err(|_| corrupt("truncated local file header".to_string()))?;
        let flags = u16::from_le_bytes([fixed[2], fixed[3]]);
        let method = u16::from_le_bytes([fixed[4], fixed[5]]);
        let compressed_size =
            u64::from(u32::from_le_bytes([fixed[14], fixed[15], fixed[16], fixed[17]]));
        let name_len = u64::from(u16::from_le_bytes([fixed[22], fixed[23]]));
        let extra_len = u64::from(u16::from_le_bytes([fixed[24], fixed[25]]));

        if flags & FLAG_ENCRYPTED != 0 {
            return Err(corrupt("encrypted member is not supported".to_string()));
        }

        // Skip member name and extra field; their content is irrelevant.
        let skip = name_len + extra_len;
        let skipped = io::copy(&mut (&mut src).take(skip), &mut io::sink())
            .map_err(|_| corrupt("truncated local file header".to_string()))?;
        if skipped != skip {
            return Err(corrupt("truncated local file header".to_string()));
        }

        let sizes_deferred =
            flags & FLAG_DATA_DESCRIPTOR != 0 || compressed_size == u64::from(u32::MAX);
        let body = match method {
            // A deflate stream is self-terminating, so a deferred size
            // (data descriptor, zip64) still streams cleanly.
            METHOD_DEFLATE => MemberBody::Deflate(DeflateDecoder::new(src)),
            METHOD_STORED if !sizes_deferred => MemberBody::Stored {
                src,
                remaining: compressed_size,
            },
            METHOD_STORED => {
                return Err(corrupt(
                    "stored member with deferred size cannot be streamed".to_string(),
                ));
            }
            other => {
                return Err(corrupt(format!("unsupported compression method {other}")));
            }
        };
        Ok(Self { body })
    }
}

impl Read for ZipMemberReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.body {
            MemberBody::Deflate(decoder) => decoder.read(buf),
            MemberBody::Stored { src, remaining } => {
                if *remaining == 0 {
                    return Ok(0);
                }
                let want = buf.len().min(usize::try_from(*remaining).unwrap_or(buf.len()));
                let n = src.read(&mut buf[..want])?;
                if n == 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("member body truncated ({remaining} bytes missing)"),
                    ));
                }
                *remaining -= n as u64;
                Ok(n)
            }
        }
    }
}

fn read_u32(src: &mut dyn Read) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    src.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Lazy iterator of [`RawLine`]s over one archive member.
///
/// Yields `Err` at most once; after a failure the stream is fused. The
/// underlying connection is released when the stream is dropped, whether
/// or not it was exhausted.
pub struct LineStream {
    body: ZipMemberReader,
    decoder: Decoder,
    encoding_name: &'static str,
    resource: Arc<str>,
    url: String,
    /// Decoded text not yet split into lines.
    pending: String,
    /// Bytes of the decompressed member consumed by the decoder.
    byte_pos: u64,
    line_number: u64,
    eof: bool,
    failed: bool,
}

impl LineStream {
    fn new(body: ZipMemberReader, resource: &RemoteResource) -> Self {
        let (decoder, encoding_name) = match resource.encoding {
            TextEncoding::ShiftJis => (SHIFT_JIS.new_decoder(), "Shift_JIS"),
            TextEncoding::Utf8 => (UTF_8.new_decoder(), "UTF-8"),
        };
        Self {
            body,
            decoder,
            encoding_name,
            resource: Arc::from(resource.label.as_str()),
            url: resource.url.clone(),
            pending: String::new(),
            byte_pos: 0,
            line_number: 0,
            eof: false,
            failed: false,
        }
    }

    /// Feed decompressed bytes through the incremental decoder.
    fn feed(&mut self, input: &[u8], last: bool) -> Result<()> {
        let mut consumed = 0;
        loop {
            self.pending.reserve(input.len() - consumed + 16);
            let (result, read) = self.decoder.decode_to_string_without_replacement(
                &input[consumed..],
                &mut self.pending,
                last,
            );
            consumed += read;
            self.byte_pos += read as u64;
            match result {
                DecoderResult::InputEmpty => return Ok(()),
                DecoderResult::OutputFull => {}
                DecoderResult::Malformed(bad, pushed) => {
                    return Err(RegistryError::Encoding {
                        resource: self.resource.to_string(),
                        encoding: self.encoding_name,
                        offset: self
                            .byte_pos
                            .saturating_sub(u64::from(bad) + u64::from(pushed)),
                    });
                }
            }
        }
    }

    /// Pop one complete line off the decode buffer, or the unterminated
    /// tail when `flush_tail` is set at end of stream.
    fn take_line(&mut self, flush_tail: bool) -> Option<RawLine> {
        let mut line = if let Some(idx) = self.pending.find('\n') {
            let rest = self.pending.split_off(idx + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.pop();
            line
        } else if flush_tail && !self.pending.is_empty() {
            std::mem::take(&mut self.pending)
        } else {
            return None;
        };
        if line.ends_with('\r') {
            line.pop();
        }
        self.line_number += 1;
        Some(RawLine {
            text: line,
            resource: Arc::clone(&self.resource),
            number: self.line_number,
        })
    }

    fn classify_io(&self, err: &io::Error) -> RegistryError {
        match err.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof => {
                RegistryError::Decompression {
                    resource: self.resource.to_string(),
                    detail: err.to_string(),
                }
            }
            _ => RegistryError::Transport {
                url: self.url.clone(),
                reason: err.to_string(),
            },
        }
    }
}

impl Iterator for LineStream {
    type Item = Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(line) = self.take_line(self.eof) {
                return Some(Ok(line));
            }
            if self.eof {
                return None;
            }
            let mut buf = [0u8; READ_CHUNK];
            match self.body.read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    if let Err(err) = self.feed(&[], true) {
                        self.failed = true;
                        return Some(Err(err));
                    }
                }
                Ok(n) => {
                    if let Err(err) = self.feed(&buf[..n], false) {
                        self.failed = true;
                        return Some(Err(err));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(self.classify_io(&err)));
                }
            }
        }
    }
}
