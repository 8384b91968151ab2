//! Flight Codecs
//!
//! Every format stores a whole table in one file and reads it back into a
//! `Vec<Flight>`.

mod binary;
mod delimited;
mod json;
mod rkyv_frames;

use crate::record::Flight;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Largest single record a framed format will read
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown CSV column {0:?}")]
    UnknownColumn(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("frame at byte {offset}: {message}")]
    Frame { offset: u64, message: String },
}

/// A file format under measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Delimited text with a header row
    Csv,
    /// One JSON array
    Json,
    /// One JSON object per line
    JsonLines,
    /// Length-delimited bincode records
    BincodeStream,
    /// Length-delimited, validated rkyv archives
    RkyvFrames,
    /// One bincode document
    Bincode,
    /// One zstd-compressed bincode document
    BincodeZstd,
}

impl Format {
    /// Every format, in suite order
    pub const ALL: [Format; 7] = [
        Format::Csv,
        Format::Json,
        Format::JsonLines,
        Format::BincodeStream,
        Format::RkyvFrames,
        Format::Bincode,
        Format::BincodeZstd,
    ];

    /// Name used in unit ids
    pub fn name(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::JsonLines => "json_lines",
            Format::BincodeStream => "bincode_stream",
            Format::RkyvFrames => "rkyv_frames",
            Format::Bincode => "bincode",
            Format::BincodeZstd => "bincode_zstd",
        }
    }

    /// Fixture file name
    pub fn file_name(self) -> &'static str {
        match self {
            Format::Csv => "data.csv",
            Format::Json => "data.json",
            Format::JsonLines => "data.jl",
            Format::BincodeStream => "data.bincode.stream",
            Format::RkyvFrames => "data.rkyv.frames",
            Format::Bincode => "data.bincode",
            Format::BincodeZstd => "data.bincode.zst",
        }
    }

    /// Write `flights` to `path`, replacing any existing file
    pub fn save(self, flights: &[Flight], path: &Path) -> Result<(), CodecError> {
        let mut writer = BufWriter::new(File::create(path)?);
        match self {
            Format::Csv => delimited::write(flights, &mut writer)?,
            Format::Json => json::write_array(flights, &mut writer)?,
            Format::JsonLines => json::write_lines(flights, &mut writer)?,
            Format::BincodeStream => binary::write_stream(flights, &mut writer)?,
            Format::RkyvFrames => rkyv_frames::write(flights, &mut writer)?,
            Format::Bincode => binary::write_document(flights, &mut writer)?,
            Format::BincodeZstd => binary::write_compressed(flights, &mut writer)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Read a whole file written by [`save`](Self::save)
    pub fn load(self, path: &Path) -> Result<Vec<Flight>, CodecError> {
        let reader = BufReader::new(File::open(path)?);
        match self {
            Format::Csv => delimited::read(reader),
            Format::Json => json::read_array(reader),
            Format::JsonLines => json::read_lines(reader),
            Format::BincodeStream => binary::read_stream(reader),
            Format::RkyvFrames => rkyv_frames::read(reader),
            Format::Bincode => binary::read_document(reader),
            Format::BincodeZstd => binary::read_compressed(reader),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| format!("Unknown format: {}", s))
    }
}

/// Write a u32-LE length prefix followed by `payload`
fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::Frame {
        offset: 0,
        message: format!("record of {} bytes does not fit a u32 length", payload.len()),
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read the next length-prefixed frame into `buf`; `false` at a clean end of file
fn read_frame<R: std::io::Read>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    offset: &mut u64,
) -> Result<bool, CodecError> {
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        match reader.read(&mut len_bytes[filled..])? {
            0 if filled == 0 => return Ok(false),
            0 => {
                return Err(CodecError::Frame {
                    offset: *offset,
                    message: "truncated length prefix".to_string(),
                });
            }
            n => filled += n,
        }
    }

    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_RECORD_SIZE {
        return Err(CodecError::Frame {
            offset: *offset,
            message: format!("record of {} bytes exceeds {} bytes", len, MAX_RECORD_SIZE),
        });
    }
    buf.clear();
    buf.resize(len, 0);
    reader.read_exact(buf).map_err(|e| CodecError::Frame {
        offset: *offset,
        message: format!("truncated record of {} bytes: {}", len, e),
    })?;
    *offset += 4 + len as u64;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::synthetic;
    use crate::validate::validate;

    #[test]
    fn test_every_format_reproduces_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut flights = synthetic(50, 7);
        flights[3].origin_city_name = Some("Quote \"City\", ST\nline two".to_string());
        flights[4] = Flight::default();

        for format in Format::ALL {
            let path = dir.path().join(format.file_name());
            format.save(&flights, &path).unwrap();
            let loaded = format.load(&path).unwrap();
            assert_eq!(loaded, flights, "format {}", format);
            validate(&loaded).unwrap();
        }
    }

    #[test]
    fn test_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        for format in Format::ALL {
            let path = dir.path().join(format.file_name());
            format.save(&[], &path).unwrap();
            assert!(format.load(&path).unwrap().is_empty(), "format {}", format);
        }
    }

    #[test]
    fn test_format_names_parse() {
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>(), Ok(format));
        }
        assert!("parquet".parse::<Format>().is_err());
    }

    #[test]
    fn test_oversized_length_rejected_before_reading() {
        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"short");
        let mut buf = Vec::new();
        let mut offset = 0;

        match read_frame(&mut bytes.as_slice(), &mut buf, &mut offset) {
            Err(CodecError::Frame { offset, message }) => {
                assert_eq!(offset, 0);
                assert!(message.contains("exceeds"), "{}", message);
            }
            other => panic!("expected frame error, got {:?}", other),
        }
        assert!(buf.capacity() < MAX_RECORD_SIZE);
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bincode.stream");
        Format::BincodeStream.save(&synthetic(3, 1), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();
        assert!(matches!(
            Format::BincodeStream.load(&path),
            Err(CodecError::Frame { .. })
        ));
    }
}
