//! Record Validation
//!
//! Checks every present field against its column kind. Absent fields are
//! always valid.

use crate::record::{Cell, FieldKind, Flight};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("record {index}: {field}: {reason}")]
pub struct ValidationError {
    pub index: usize,
    pub field: &'static str,
    pub reason: String,
}

/// Validate all records, stopping at the first invalid field
pub fn validate(flights: &[Flight]) -> Result<(), ValidationError> {
    flights
        .iter()
        .enumerate()
        .try_for_each(|(index, flight)| validate_one(index, flight))
}

fn validate_one(index: usize, flight: &Flight) -> Result<(), ValidationError> {
    let mut first_error = None;
    flight.visit_fields(|field, kind, cell| {
        if first_error.is_some() {
            return;
        }
        if let Some(cell) = cell {
            if let Err(reason) = check(kind, cell) {
                first_error = Some(ValidationError {
                    index,
                    field,
                    reason,
                });
            }
        }
    });
    first_error.map_or(Ok(()), Err)
}

fn check(kind: FieldKind, cell: Cell<'_>) -> Result<(), String> {
    match (kind, cell) {
        (FieldKind::Date, Cell::Text(text)) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(|_| ())
            .map_err(|e| format!("invalid date {:?}: {}", text, e)),
        (FieldKind::Str, Cell::Text(text)) if text.is_empty() => {
            Err("empty string".to_string())
        }
        (FieldKind::Str, Cell::Text(_)) => Ok(()),
        (FieldKind::Int, Cell::Int(value)) if value < 0 => {
            Err(format!("negative value {}", value))
        }
        (FieldKind::Int, Cell::Int(_)) => Ok(()),
        (FieldKind::Float, Cell::Float(value)) if !value.is_finite() => {
            Err(format!("non-finite value {}", value))
        }
        (FieldKind::Float, Cell::Float(_)) => Ok(()),
        (kind, cell) => Err(format!("{:?} does not hold a {:?} column", cell, kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Flight {
        Flight {
            fl_date: Some("2017-02-28".to_string()),
            airline_id: Some(19805),
            carrier: Some("AA".to_string()),
            dep_delay: Some(-4.0),
            ..Flight::default()
        }
    }

    #[test]
    fn test_valid_records_pass() {
        assert_eq!(validate(&[valid(), Flight::default()]), Ok(()));
    }

    #[test]
    fn test_impossible_date_rejected() {
        let mut flight = valid();
        flight.fl_date = Some("2017-02-30".to_string());
        let err = validate(&[valid(), flight]).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.field, "FL_DATE");
    }

    #[test]
    fn test_negative_integer_rejected() {
        let mut flight = valid();
        flight.fl_num = Some(-1);
        assert_eq!(validate(&[flight]).unwrap_err().field, "FL_NUM");
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let mut flight = valid();
        flight.air_time = Some(f64::NAN);
        assert_eq!(validate(&[flight]).unwrap_err().field, "AIR_TIME");
    }

    #[test]
    fn test_empty_string_rejected() {
        let mut flight = valid();
        flight.tail_num = Some(String::new());
        let err = validate(&[flight]).unwrap_err();
        assert_eq!(err.to_string(), "record 0: TAIL_NUM: empty string");
    }
}
