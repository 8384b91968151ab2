//! Length-prefixed rkyv archives, one per record, validated on read.

use super::{CodecError, read_frame, write_frame};
use crate::record::Flight;
use rkyv::{AlignedVec, Deserialize, Infallible};
use std::io::{Read, Write};

pub(super) fn write<W: Write>(flights: &[Flight], writer: &mut W) -> Result<(), CodecError> {
    for flight in flights {
        let bytes = rkyv::to_bytes::<_, 1024>(flight).map_err(|e| CodecError::Frame {
            offset: 0,
            message: format!("serialization failed: {}", e),
        })?;
        write_frame(writer, &bytes)?;
    }
    Ok(())
}

pub(super) fn read<R: Read>(mut reader: R) -> Result<Vec<Flight>, CodecError> {
    let mut flights = Vec::new();
    let mut buf = Vec::new();
    let mut offset = 0;
    // rkyv needs the archive 16-byte aligned
    let mut aligned = AlignedVec::new();
    loop {
        let frame_start = offset;
        if !read_frame(&mut reader, &mut buf, &mut offset)? {
            break;
        }
        aligned.clear();
        aligned.extend_from_slice(&buf);

        let archived = rkyv::check_archived_root::<Flight>(&aligned).map_err(|e| {
            CodecError::Frame {
                offset: frame_start,
                message: format!("invalid archive: {}", e),
            }
        })?;
        let flight: Flight = archived
            .deserialize(&mut Infallible)
            .map_err(|_| CodecError::Frame {
                offset: frame_start,
                message: "archive deserialization failed".to_string(),
            })?;
        flights.push(flight);
    }
    Ok(flights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_archive_rejected() {
        let flight = Flight {
            carrier: Some("AA".to_string()),
            ..Flight::default()
        };
        let mut out = Vec::new();
        write(&[flight], &mut out).unwrap();
        let last = out.len() - 1;
        out[4..last].iter_mut().for_each(|b| *b = 0xff);

        assert!(matches!(
            read(out.as_slice()),
            Err(CodecError::Frame { offset: 0, .. })
        ));
    }
}
