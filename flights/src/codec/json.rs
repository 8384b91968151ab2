use super::CodecError;
use crate::record::Flight;
use std::io::{BufRead, Read, Write};

pub(super) fn write_array<W: Write>(flights: &[Flight], writer: &mut W) -> Result<(), CodecError> {
    serde_json::to_writer(writer, flights)?;
    Ok(())
}

pub(super) fn read_array<R: Read>(reader: R) -> Result<Vec<Flight>, CodecError> {
    Ok(serde_json::from_reader(reader)?)
}

pub(super) fn write_lines<W: Write>(flights: &[Flight], writer: &mut W) -> Result<(), CodecError> {
    for flight in flights {
        serde_json::to_writer(&mut *writer, flight)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Blank lines are skipped
pub(super) fn read_lines<R: BufRead>(reader: R) -> Result<Vec<Flight>, CodecError> {
    let mut flights = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        flights.push(serde_json::from_str(&line)?);
    }
    Ok(flights)
}
