//! bincode documents, record streams and zstd-compressed documents.

use super::{CodecError, read_frame, write_frame};
use crate::record::Flight;
use bincode::config::{Configuration, standard};
use std::io::{Read, Write};

const ZSTD_LEVEL: i32 = 3;

fn config() -> Configuration {
    standard()
}

pub(super) fn write_document<W: Write>(
    flights: &[Flight],
    writer: &mut W,
) -> Result<(), CodecError> {
    bincode::serde::encode_into_std_write(flights, writer, config())?;
    Ok(())
}

pub(super) fn read_document<R: Read>(mut reader: R) -> Result<Vec<Flight>, CodecError> {
    Ok(bincode::serde::decode_from_std_read(&mut reader, config())?)
}

pub(super) fn write_compressed<W: Write>(
    flights: &[Flight],
    writer: &mut W,
) -> Result<(), CodecError> {
    let mut encoder = zstd::stream::write::Encoder::new(writer, ZSTD_LEVEL)?;
    bincode::serde::encode_into_std_write(flights, &mut encoder, config())?;
    encoder.finish()?;
    Ok(())
}

pub(super) fn read_compressed<R: Read>(reader: R) -> Result<Vec<Flight>, CodecError> {
    let mut decoder = zstd::stream::read::Decoder::new(reader)?;
    Ok(bincode::serde::decode_from_std_read(&mut decoder, config())?)
}

/// Each record is its own length-prefixed bincode document
pub(super) fn write_stream<W: Write>(
    flights: &[Flight],
    writer: &mut W,
) -> Result<(), CodecError> {
    for flight in flights {
        let payload = bincode::serde::encode_to_vec(flight, config())?;
        write_frame(writer, &payload)?;
    }
    Ok(())
}

pub(super) fn read_stream<R: Read>(mut reader: R) -> Result<Vec<Flight>, CodecError> {
    let mut flights = Vec::new();
    let mut buf = Vec::new();
    let mut offset = 0;
    while read_frame(&mut reader, &mut buf, &mut offset)? {
        let (flight, _) = bincode::serde::decode_from_slice(&buf, config())?;
        flights.push(flight);
    }
    Ok(flights)
}
