//! Comma-separated text with a header row, one column per flight field.
//!
//! An empty cell is an absent value.

use super::CodecError;
use crate::record::{FIELD_NAMES, Flight};
use std::io::{Read, Write};

pub(super) fn write<W: Write>(flights: &[Flight], writer: &mut W) -> Result<(), CodecError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if flights.is_empty() {
        // serialize() only emits the header alongside the first record
        wtr.write_record(FIELD_NAMES)?;
    }
    for flight in flights {
        wtr.serialize(flight)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Columns may appear in any order or be left out; unknown columns are an error
pub(super) fn read<R: Read>(reader: R) -> Result<Vec<Flight>, CodecError> {
    let mut rdr = csv::ReaderBuilder::new().from_reader(reader);

    if let Some(unknown) = rdr
        .headers()?
        .iter()
        .find(|column| !FIELD_NAMES.contains(column))
    {
        return Err(CodecError::UnknownColumn(unknown.to_string()));
    }

    rdr.deserialize()
        .map(|record| record.map_err(CodecError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_line(err: &CodecError) -> Option<u64> {
        match err {
            CodecError::Csv(e) => e.position().map(|p| p.line()),
            _ => None,
        }
    }

    #[test]
    fn test_header_selects_columns() {
        let input = "CARRIER,FL_NUM,DEST_CITY_NAME\nAA,12,\"Dallas, TX\"\nUA,,Denver\n";
        let flights = read(input.as_bytes()).unwrap();
        assert_eq!(flights.len(), 2);
        assert_eq!(flights[0].fl_num, Some(12));
        assert_eq!(flights[0].dest_city_name.as_deref(), Some("Dallas, TX"));
        assert_eq!(flights[1].fl_num, None);
        assert_eq!(flights[1].fl_date, None);
    }

    #[test]
    fn test_empty_cell_is_null() {
        let flight = Flight {
            carrier: Some("AA".to_string()),
            ..Flight::default()
        };
        let mut out = Vec::new();
        write(&[flight.clone()], &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row.matches(',').count(), FIELD_NAMES.len() - 1);
        assert!(row.split(',').filter(|cell| cell.is_empty()).count() == FIELD_NAMES.len() - 1);

        assert_eq!(read(out.as_slice()).unwrap(), vec![flight]);
    }

    #[test]
    fn test_quoting_survives() {
        let flight = Flight {
            origin_city_name: Some("Say \"hi\", TX\r\nsecond line".to_string()),
            ..Flight::default()
        };
        let mut out = Vec::new();
        write(&[flight.clone()], &mut out).unwrap();
        assert_eq!(read(out.as_slice()).unwrap(), vec![flight]);
    }

    #[test]
    fn test_header_only_file_is_empty_table() {
        let mut out = Vec::new();
        write(&[], &mut out).unwrap();
        assert!(String::from_utf8_lossy(&out).starts_with("FL_DATE,AIRLINE_ID,"));
        assert!(read(out.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn test_bad_cell_reports_line() {
        let input = "CARRIER,FL_NUM\nAA,1\nUA,one\n";
        let err = read(input.as_bytes()).unwrap_err();
        assert_eq!(error_line(&err), Some(3), "{}", err);
    }

    #[test]
    fn test_ragged_row_rejected() {
        let input = "CARRIER,FL_NUM\nAA\n";
        let err = read(input.as_bytes()).unwrap_err();
        assert_eq!(error_line(&err), Some(2), "{}", err);
    }

    #[test]
    fn test_unknown_column_rejected() {
        match read("CARRIER,GATE\nAA,B12\n".as_bytes()) {
            Err(CodecError::UnknownColumn(column)) => assert_eq!(column, "GATE"),
            other => panic!("expected unknown column, got {:?}", other),
        }
    }
}
